use anyhow::Result;
use std::time::Duration;
use tailnet_admin::auth::{unix_now, Credential, StoredToken, TokenStore, EXPIRY_MARGIN_SECS};

fn token(tailnet: &str, expires_at: u64) -> StoredToken {
    StoredToken {
        tailnet: tailnet.to_string(),
        access_token: "tskey-access-123".to_string(),
        token_type: "Bearer".to_string(),
        expires_at,
    }
}

#[tokio::test]
async fn test_missing_token_file_loads_as_none() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = TokenStore::new(dir.path().join("token.json"));

    assert!(store.load().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_save_then_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = TokenStore::new(dir.path().join("nested").join("token.json"));
    let saved = token("example.com", unix_now() + 3600);

    store.save(&saved).await?;

    assert_eq!(store.load().await?, Some(saved));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_token_file_is_private() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let store = TokenStore::new(dir.path().join("token.json"));
    store.save(&token("example.com", unix_now() + 3600)).await?;

    let mode = std::fs::metadata(store.path())?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    Ok(())
}

#[tokio::test]
async fn test_clear_reports_whether_a_token_existed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = TokenStore::new(dir.path().join("token.json"));

    assert!(!store.clear().await?);
    store.save(&token("example.com", unix_now() + 3600)).await?;
    assert!(store.clear().await?);
    assert!(store.load().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_token_file_is_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("token.json");
    std::fs::write(&path, "not json")?;

    let err = TokenStore::new(&path).load().await.unwrap_err();
    assert!(err.to_string().contains("corrupt"));
    Ok(())
}

#[test]
fn test_expiry_includes_margin() {
    let now = 1_000_000;

    assert!(!token("t", now + EXPIRY_MARGIN_SECS + 1).is_expired_at(now));
    assert!(token("t", now + EXPIRY_MARGIN_SECS).is_expired_at(now));
    assert!(token("t", now - 1).is_expired_at(now));
}

#[test]
fn test_remaining_time() {
    let now = 1_000_000;

    assert_eq!(
        token("t", now + 90).remaining_at(now),
        Some(Duration::from_secs(90))
    );
    assert_eq!(token("t", now).remaining_at(now), None);
    assert_eq!(token("t", now - 5).remaining_at(now), None);
}

#[test]
fn test_credential_bearer() {
    assert_eq!(Credential::ApiKey("tskey-api-1".into()).bearer(), "tskey-api-1");
    assert_eq!(
        Credential::OAuth(token("t", 0)).bearer(),
        "tskey-access-123"
    );
}
