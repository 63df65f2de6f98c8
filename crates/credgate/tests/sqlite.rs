//! Mediator behaviour on the SQLite backend, across reopens.

use credgate::consent::ConsentError;
use credgate::store::SqliteStore;
use credgate::{ChainStatus, CredentialType, MediatorConfig, MediatorError, MemoryLedger, Principal};
use credgate_testkit::{TestFixture, DAY, FIXTURE_EPOCH};
use rusqlite::{params, Connection};
use tempfile::TempDir;

fn fixture(dir: &TempDir) -> anyhow::Result<TestFixture<SqliteStore, MemoryLedger>> {
    let store = SqliteStore::open(dir.path().join("credgate.db"))?;
    Ok(TestFixture::with_parts(
        store,
        MemoryLedger::new(),
        MediatorConfig::default(),
    ))
}

#[tokio::test]
async fn test_state_survives_reopen() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (alice, techcorp, diploma, hash) = {
        let fx = fixture(&dir)?;
        let alice = fx.party("alice").await;
        let techcorp = fx.party("techcorp").await;
        let (diploma, hash) = fx.credential(&alice, "Bachelor_Diploma").await;
        fx.grant(&alice, &techcorp, &diploma, 30 * DAY).await;
        fx.mediator.access_data(&techcorp, &alice, &diploma).await?;
        (alice, techcorp, diploma, hash)
    };

    let fx = fixture(&dir)?;
    assert!(fx.mediator.is_registered(&alice).await);
    assert_eq!(
        fx.mediator.consent_expiry(&alice, &techcorp, &diploma).await?,
        FIXTURE_EPOCH + 30 * DAY
    );
    assert_eq!(fx.mediator.access_data(&techcorp, &alice, &diploma).await?, hash);

    // Registration is still write-once after the restart
    let again = fx
        .mediator
        .register(&alice, hash, hash, hash)
        .await
        .unwrap_err();
    assert!(matches!(
        again,
        MediatorError::Consent(ConsentError::AlreadyRegistered { .. })
    ));

    // The log continues where it left off
    assert_eq!(fx.mediator.log_count().await?, 2);
    assert_eq!(fx.mediator.log_by_index(1).await?.index, 1);
    assert_eq!(
        fx.mediator.verify_chain().await?,
        ChainStatus::Intact { entries: 2 }
    );
    Ok(())
}

#[tokio::test]
async fn test_tampered_log_is_detected() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    {
        let fx = fixture(&dir)?;
        let alice = fx.party("alice").await;
        let techcorp = fx.party("techcorp").await;
        let (diploma, _) = fx.credential(&alice, "Bachelor_Diploma").await;
        for _ in 0..3 {
            let _ = fx.mediator.access_data(&techcorp, &alice, &diploma).await;
        }
    }

    {
        let conn = Connection::open(dir.path().join("credgate.db"))?;
        let blocked = conn.execute(
            "UPDATE access_log SET reason = 'access_granted' WHERE log_index = 1",
            [],
        );
        assert!(blocked.is_err(), "append-only trigger must reject updates");

        conn.execute_batch("DROP TRIGGER access_log_no_update")?;
        conn.execute(
            "UPDATE access_log SET granted = 1 WHERE log_index = 1",
            [],
        )?;
    }

    let fx = fixture(&dir)?;
    assert_eq!(
        fx.mediator.verify_chain().await?,
        ChainStatus::BrokenAt { index: 1 }
    );
    Ok(())
}

#[tokio::test]
async fn test_consent_without_credential_denies_and_logs() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let alice = Principal::from_name("alice");
    let techcorp = Principal::from_name("techcorp");
    let orphan = CredentialType::from_label("Orphaned");
    {
        let fx = fixture(&dir)?;
        fx.party("alice").await;
        fx.party("techcorp").await;
    }

    // A consent row whose credential was never stored
    {
        let conn = Connection::open(dir.path().join("credgate.db"))?;
        conn.execute(
            "INSERT INTO consents (owner, requester, credential_type, expiry, granted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                alice.as_bytes().as_slice(),
                techcorp.as_bytes().as_slice(),
                orphan.as_bytes().as_slice(),
                (FIXTURE_EPOCH + DAY) as i64,
                FIXTURE_EPOCH as i64,
            ],
        )?;
    }

    let fx = fixture(&dir)?;
    assert!(fx.mediator.can_access(&alice, &techcorp, &orphan).await);

    let err = fx
        .mediator
        .access_data(&techcorp, &alice, &orphan)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MediatorError::Consent(ConsentError::CredentialNotFound { .. })
    ));

    let entry = fx.mediator.log_by_index(0).await?;
    assert!(!entry.granted);
    assert_eq!(entry.reason, "credential_not_found");
    assert!(entry.credential_hash.is_zero());
    Ok(())
}
