//! Best-effort device/browser classification from the User-Agent header.
//!
//! Audit rows and refresh-token labels only; never used for any
//! security decision.

/// Derived labels for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device: String,
    pub browser: String,
}

impl DeviceInfo {
    /// Combined label stored on refresh tokens, e.g. "Windows - Chrome".
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.device, self.browser)
    }
}

#[must_use]
pub fn classify(user_agent: &str) -> DeviceInfo {
    let ua = user_agent.to_lowercase();

    let device = if ua.contains("android") {
        "Android"
    } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        "iOS"
    } else if ua.contains("windows") {
        "Windows"
    } else if ua.contains("mac os") || ua.contains("macintosh") {
        "macOS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Desconhecido"
    };

    // Order matters: Edge and Opera embed "chrome", Chrome embeds "safari"
    let browser = if ua.contains("edg/") || ua.contains("edge") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("firefox") {
        "Firefox"
    } else if ua.contains("chrome") || ua.contains("crios") {
        "Chrome"
    } else if ua.contains("safari") {
        "Safari"
    } else {
        "Desconhecido"
    };

    DeviceInfo {
        device: device.to_string(),
        browser: browser.to_string(),
    }
}
