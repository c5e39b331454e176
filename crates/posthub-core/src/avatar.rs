/// Number of bundled avatar images (`/avatar1.png` .. `/avatarN.png`).
pub const AVATAR_COUNT: u64 = 3;

const DEFAULT_AVATAR: &str = "/avatar1.png";

/// Picks a stock avatar for a wallet address.
///
/// The first 8 hex characters after `0x` seed the choice, so the same
/// address always maps to the same image. Parsing stops at the first non-hex
/// character; an address with no leading hex digits gets the default.
pub fn avatar_src(address: Option<&str>) -> String {
    let Some(address) = address.filter(|a| !a.is_empty()) else {
        return DEFAULT_AVATAR.to_string();
    };

    let lower = address.to_lowercase();
    let clean = lower.strip_prefix("0x").unwrap_or(&lower);

    let digits: String = clean
        .chars()
        .take(8)
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();

    match u64::from_str_radix(&digits, 16) {
        Ok(seed) => format!("/avatar{}.png", seed % AVATAR_COUNT + 1),
        Err(_) => DEFAULT_AVATAR.to_string(),
    }
}
