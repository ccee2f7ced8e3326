//! Pre-flight checks run before building name operations.

use tracing::debug;

use crate::error::{Error, Result};
use crate::network::NetworkProvider;
use crate::utils::constants::{MAX_NAMES_PER_ADDRESS, MAX_NAME_LENGTH, NAME_GRACE_PERIOD};

const MIN_NAME_LENGTH: usize = 3;

/// Check the shape of a fully qualified `name.namespace`.
///
/// Lowercase alphanumerics and `-_.+` only, 3 to 37 characters, exactly one
/// dot, and a non-empty label on both sides of it.
pub fn is_name_valid(name: &str) -> bool {
    if name.len() < MIN_NAME_LENGTH || name.len() > MAX_NAME_LENGTH {
        return false;
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "-_.+".contains(c);
    if !name.chars().all(allowed) {
        return false;
    }

    match name.split_once('.') {
        Some((label, namespace)) => !label.is_empty() && !namespace.is_empty() && !namespace.contains('.'),
        None => false,
    }
}

/// Turn a `NotFound` into `Ok(None)`
fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether `name` is unregistered
pub async fn is_name_available(provider: &NetworkProvider, name: &str) -> Result<bool> {
    Ok(found(provider.get_name_info(name).await)?.is_none())
}

/// Whether `namespace_id` has not been revealed
pub async fn is_namespace_available(provider: &NetworkProvider, namespace_id: &str) -> Result<bool> {
    Ok(found(provider.registry().get_namespace_info(namespace_id).await)?.is_none())
}

/// Whether `address` currently owns `name`
pub async fn owns_name(provider: &NetworkProvider, name: &str, address: &str) -> Result<bool> {
    let info = found(provider.get_name_info(name).await)?;
    Ok(info.and_then(|i| i.address).as_deref() == Some(address))
}

/// Whether `address` may receive one more name
pub async fn address_can_receive_name(provider: &NetworkProvider, address: &str) -> Result<bool> {
    let owned = provider.get_names_owned(address).await?;
    debug!(address, owned = owned.len(), "names owned");
    Ok(owned.len() < MAX_NAMES_PER_ADDRESS)
}

/// Whether `name` has expired but is still reserved for its owner
pub async fn is_in_grace_period(provider: &NetworkProvider, name: &str) -> Result<bool> {
    let Some(info) = found(provider.get_name_info(name).await)? else {
        return Ok(false);
    };
    let Some(expire_block) = info.expire_block else {
        return Ok(false);
    };

    let height = provider.get_block_height().await?;
    Ok(height >= expire_block && height < expire_block.saturating_add(NAME_GRACE_PERIOD))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in [
            "abc123.id",
            "abcd123.1",
            "123456789012345678901234567890.123456",
            "abc_+-123.id",
        ] {
            assert!(is_name_valid(name), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "123456789012345678901234567890.1234567",
            "abcdefghijklmnopqrstuvwxyz",
            "a.b.c",
            ".43",
            "abc#.id",
            "ab c.id",
            "ABC.id",
            "a.",
            "",
        ] {
            assert!(!is_name_valid(name), "{:?} should be invalid", name);
        }
    }

    #[test]
    fn test_found() {
        assert_eq!(found::<u8>(Ok(1)).unwrap(), Some(1));
        assert_eq!(found::<u8>(Err(Error::NotFound("x".into()))).unwrap(), None);
        assert!(found::<u8>(Err(Error::Lock)).is_err());
    }
}
