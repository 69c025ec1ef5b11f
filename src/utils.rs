use crate::transfer::STX_DECIMALS;

/// Format a micro-STX amount as STX with all six decimals
pub fn format_micro_stx(micro: u128) -> String {
    let factor = 10u128.pow(STX_DECIMALS);
    format!(
        "{}.{:0width$}",
        micro / factor,
        micro % factor,
        width = STX_DECIMALS as usize
    )
}

/// Shorten an address to its first five and last four characters
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
