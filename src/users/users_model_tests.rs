//! Tests for user input normalization and the credential rules.

#[cfg(test)]
mod tests {
    use crate::errors::Error;
    use crate::users::users_model::{
        hash_password, normalize_email, normalize_username, validate_password,
    };

    #[test]
    fn username_is_trimmed_and_lowercased() {
        assert_eq!(normalize_username("  CryptoFan  ").unwrap(), "cryptofan");
    }

    #[test]
    fn username_allows_dots_and_underscores_inside() {
        assert_eq!(normalize_username("c.f_42").unwrap(), "c.f_42");
    }

    #[test]
    fn username_rejects_illegal_characters() {
        assert!(matches!(
            normalize_username("crypto fan"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn username_rejects_leading_or_trailing_separator() {
        assert!(normalize_username(".cryptofan").is_err());
        assert!(normalize_username("cryptofan_").is_err());
    }

    #[test]
    fn username_rejects_reserved_names() {
        assert!(matches!(
            normalize_username("Admin"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn username_rejects_out_of_range_length() {
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Satoshi@Example.COM ").unwrap(),
            "satoshi@example.com"
        );
    }

    #[test]
    fn email_rejects_malformed_addresses() {
        assert!(normalize_email("satoshi").is_err());
        assert!(normalize_email("satoshi@example").is_err());
        assert!(normalize_email("sat oshi@example.com").is_err());
    }

    #[test]
    fn password_accepts_a_strong_one() {
        assert!(validate_password("Str0ng!pass").is_ok());
    }

    #[test]
    fn password_rejects_short_or_weak_ones() {
        // Too short (must be longer than eight characters).
        assert!(validate_password("Ab1!xyzw").is_err());
        // Missing uppercase / lowercase / digit / special.
        assert!(validate_password("str0ng!pass").is_err());
        assert!(validate_password("STR0NG!PASS").is_err());
        assert!(validate_password("Strong!pass").is_err());
        assert!(validate_password("Str0ngpass").is_err());
    }

    #[test]
    fn password_hash_is_sha256_hex() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
