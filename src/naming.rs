//! Artifact naming
//!
//! Base names look like `Contrato_Maria_da_Silva_2025-03-14_093005`. Two
//! requests for the same client in the same second collide; that is accepted.

use chrono::NaiveDateTime;

pub const ARTIFACT_PREFIX: &str = "Contrato";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Build the artifact base name (no extension) for a client at a given instant.
pub fn artifact_base_name(client_name: &str, now: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}",
        ARTIFACT_PREFIX,
        slugify(client_name),
        now.format(TIMESTAMP_FORMAT)
    )
}

fn slugify(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_base_name_format() {
        assert_eq!(
            artifact_base_name("Maria da Silva", instant()),
            "Contrato_Maria_da_Silva_2025-03-14_093005"
        );
    }

    #[test]
    fn test_unsafe_characters_are_dropped() {
        assert_eq!(
            artifact_base_name("José/../Ltda. & Cia", instant()),
            "Contrato_JoséLtda__Cia_2025-03-14_093005"
        );
    }

    #[test]
    fn test_hyphen_and_underscore_kept() {
        assert_eq!(slugify("Ana-Paula_Souza"), "Ana-Paula_Souza");
    }

    #[test]
    fn test_same_second_same_name_collides() {
        let a = artifact_base_name("Cliente", instant());
        let b = artifact_base_name("Cliente", instant());
        assert_eq!(a, b);
    }
}
