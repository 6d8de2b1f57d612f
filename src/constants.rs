pub mod tokens {

    /// Random bytes behind refresh and password-reset tokens
    /// (hex-encoded to 64 chars).
    pub const OPAQUE_TOKEN_BYTES: usize = 32;
}

pub mod audit {

    pub const LOGIN: &str = "LOGIN";

    pub const LOGOUT: &str = "LOGOUT";

    pub const LOGOUT_ALL: &str = "LOGOUT_ALL";

    pub const RESET_SENHA: &str = "RESET_SENHA";
}
