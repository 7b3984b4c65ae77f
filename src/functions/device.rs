//! Coarse user-agent parsing for session logs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub os: String,
    pub browser: String,
    #[serde(default)]
    pub browser_version: Option<String>,
}

// Order matters: Edge and Opera also advertise Chrome, Chrome advertises Safari.
static BROWSERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("Edge", Regex::new(r"Edg(?:e|A|iOS)?/([\d.]+)").unwrap()),
        ("Opera", Regex::new(r"(?:OPR|Opera)/([\d.]+)").unwrap()),
        ("Samsung Internet", Regex::new(r"SamsungBrowser/([\d.]+)").unwrap()),
        ("Firefox", Regex::new(r"(?:Firefox|FxiOS)/([\d.]+)").unwrap()),
        ("Chrome", Regex::new(r"(?:Chrome|CriOS)/([\d.]+)").unwrap()),
        ("Safari", Regex::new(r"Version/([\d.]+).*Safari/").unwrap()),
    ]
});

pub fn parse_user_agent(ua: &str) -> DeviceInfo {
    let (browser, browser_version) = BROWSERS
        .iter()
        .find_map(|(name, re)| re.captures(ua).map(|c| (name.to_string(), c.get(1).map(|m| m.as_str().to_string()))))
        .unwrap_or_else(|| ("Unknown".to_string(), None));
    DeviceInfo { device_type: device_type(ua), os: os_name(ua).to_string(), browser, browser_version }
}

fn device_type(ua: &str) -> DeviceType {
    let android = ua.contains("Android");
    if ua.contains("iPad") || ua.contains("Tablet") || (android && !ua.contains("Mobile")) {
        DeviceType::Tablet
    } else if ua.contains("Mobi") || ua.contains("iPhone") || android {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    }
}

fn os_name(ua: &str) -> &'static str {
    // iOS user agents also say "like Mac OS X"
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        "iOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("CrOS") {
        "ChromeOS"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Unknown"
    }
}
