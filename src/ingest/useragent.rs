/// User-Agent classifier producing the `{browser, device_type}` pair stored
/// on every event. Simple ordered string matching; unrecognized agents fall
/// back to "Unknown Browser" / "Desktop".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub browser: String,
    pub device_type: String,
}

/// Classify a User-Agent string.
pub fn classify(ua: &str) -> Classified {
    Classified {
        browser: detect_browser(ua).to_string(),
        device_type: detect_device(ua).to_string(),
    }
}

fn detect_browser(ua: &str) -> &'static str {
    // Order matters: check more specific patterns first
    if ua.contains("Edg/") || ua.contains("Edge/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("Chromium/") {
        "Chromium"
    } else if ua.contains("Chrome/") {
        "Chrome"
    } else if ua.contains("Safari/") && !ua.contains("Chrome/") {
        "Safari"
    } else if ua.contains("Firefox/") {
        "Firefox"
    } else {
        "Unknown Browser"
    }
}

fn detect_device(ua: &str) -> &'static str {
    // iPad agents carry mobile tokens too, so tablets go first
    if ua.contains("iPad") || ua.contains("Tablet") {
        "Tablet"
    } else if ua.contains("Android") && !ua.contains("Mobile") {
        "Tablet"
    } else if ua.contains("Mobi") || ua.contains("iPhone") || ua.contains("Android") {
        "Mobile"
    } else {
        "Desktop"
    }
}
