//! CLI command implementations.

pub mod check_config;
pub mod params;
pub mod render;

/// Parse a `key=value` argument.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!(
            "Invalid parameter format: '{}' (expected name=value)",
            s
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("filter_cutoff=800"),
            Ok(("filter_cutoff".to_string(), "800".to_string()))
        );
        assert_eq!(
            parse_key_val("osc1_waveform = square"),
            Ok(("osc1_waveform".to_string(), "square".to_string()))
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=1").is_err());
    }
}
