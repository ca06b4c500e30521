use alloy::primitives::{B256, FixedBytes};
use blst::BLST_ERROR;
use log::*;
use std::time::Duration;
use tree_hash::TreeHash;

use crate::account::{Account, BlsPublicKey, BlsSignature, Lockable, SigningMode};
use crate::error::{Error, Result};

// Proof-of-possession ciphersuite used by the consensus layer
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

#[derive(Debug, tree_hash_derive::TreeHash)]
pub struct SigningData {
    pub object_root: B256,
    pub domain: B256,
}

pub fn signing_root(object_root: &B256, domain: &B256) -> B256 {
    SigningData {
        object_root: *object_root,
        domain: *domain,
    }
    .tree_hash_root()
}

/// Holds an account unlocked for as long as it lives. Relocks on drop if,
/// and only if, the account was locked when the guard was taken.
struct UnlockGuard<'a> {
    label: String,
    locker: Option<&'a dyn Lockable>,
    relock: bool,
    timeout: Duration,
}

impl<'a> UnlockGuard<'a> {
    fn acquire(account: &'a Account, passphrases: &[String], timeout: Duration) -> Result<Self> {
        let label = account.label();
        let Some(locker) = account.holder().as_lockable() else {
            return Ok(UnlockGuard {
                label,
                locker: None,
                relock: false,
                timeout,
            });
        };

        let unlocked = locker
            .is_unlocked(timeout)
            .map_err(|e| Error::SignerError {
                account: label.clone(),
                reason: format!("failed to query lock state: {}", e),
            })?;
        if unlocked {
            trace!("Account {} already unlocked", label);
            return Ok(UnlockGuard {
                label,
                locker: Some(locker),
                relock: false,
                timeout,
            });
        }

        for (i, passphrase) in passphrases.iter().enumerate() {
            match locker.unlock(passphrase, timeout) {
                Ok(()) => {
                    debug!("Unlocked {} with passphrase #{}", label, i + 1);
                    return Ok(UnlockGuard {
                        label,
                        locker: Some(locker),
                        relock: true,
                        timeout,
                    });
                }
                Err(e) => trace!("Passphrase #{} rejected for {}: {}", i + 1, label, e),
            }
        }
        Err(Error::UnlockFailed(label))
    }
}

impl Drop for UnlockGuard<'_> {
    fn drop(&mut self) {
        if !self.relock {
            return;
        }
        if let Some(locker) = self.locker {
            match locker.lock(self.timeout) {
                Ok(()) => trace!("Relocked {}", self.label),
                Err(e) => warn!("Failed to relock account {}: {}", self.label, e),
            }
        }
    }
}

/// Signs `object_root` under `domain` with `account`, unlocking it with the
/// first accepted passphrase. The account's lock state on return matches the
/// state on entry, whether or not signing succeeded.
pub fn sign_root(
    account: &Account,
    passphrases: &[String],
    object_root: &B256,
    domain: &B256,
    timeout: Duration,
) -> Result<BlsSignature> {
    let mode = account.signing_mode()?;
    let _guard = UnlockGuard::acquire(account, passphrases, timeout)?;

    let holder = account.holder();
    let signed = match mode {
        SigningMode::Protecting => holder
            .as_protecting_signer()
            .ok_or_else(|| Error::SigningUnsupported(account.label()))?
            .sign_generic(object_root, domain, timeout),
        SigningMode::Plain => {
            let root = signing_root(object_root, domain);
            trace!("Signing root: {}", root);
            holder
                .as_signer()
                .ok_or_else(|| Error::SigningUnsupported(account.label()))?
                .sign(&root, timeout)
        }
    };
    signed.map_err(|e| Error::SignerError {
        account: account.label(),
        reason: e.to_string(),
    })
}

pub fn parse_public_key(field: &'static str, pubkey: &BlsPublicKey) -> Result<blst::min_pk::PublicKey> {
    blst::min_pk::PublicKey::key_validate(pubkey.as_slice())
        .map_err(|_| Error::InvalidPublicKey { field })
}

/// Checks `signature` over `object_root` under `domain`. A signature that is
/// not a valid curve point simply fails to verify.
pub fn verify_root(
    pubkey: &BlsPublicKey,
    object_root: &B256,
    domain: &B256,
    signature: &BlsSignature,
) -> Result<bool> {
    let pk = parse_public_key("public key", pubkey)?;
    let Ok(sig) = blst::min_pk::Signature::from_bytes(signature.as_slice()) else {
        debug!("Signature is not a valid G2 point");
        return Ok(false);
    };
    let root = signing_root(object_root, domain);
    Ok(sig.verify(true, root.as_slice(), BLS_DST, &[], &pk, true) == BLST_ERROR::BLST_SUCCESS)
}

/// Signature over an arbitrary message with a raw secret key, used by
/// holders that keep key material in memory.
pub fn sign_with_secret(secret: &[u8], message: &[u8]) -> eyre::Result<BlsSignature> {
    let sk = blst::min_pk::SecretKey::from_bytes(secret)
        .map_err(|e| eyre::eyre!("invalid secret key: {:?}", e))?;
    Ok(FixedBytes(sk.sign(message, BLS_DST, &[]).compress()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::account::tests::{INTEROP_0, INTEROP_1};
    use crate::account::{KeyHolder, ProtectingSigner, ScratchAccount, Signer};
    use crate::domain::deposit_domain;
    use crate::error::decode_fixed;
    use alloy::primitives::b256;
    use std::sync::{Arc, Mutex};

    const TIMEOUT: Duration = Duration::from_secs(10);

    /// Key holder with scripted behaviour for lock and signing failures.
    #[derive(Debug)]
    pub struct MockHolder {
        pub name: String,
        secret: [u8; 32],
        pub passphrase: String,
        pub unlocked: Mutex<bool>,
        pub fail_lock: bool,
        pub fail_sign: bool,
        pub protecting: bool,
        pub calls: Mutex<Vec<&'static str>>,
        pub timeouts: Mutex<Vec<Duration>>,
    }

    impl MockHolder {
        pub fn new(name: &str, private_key: &str, passphrase: &str) -> Self {
            MockHolder {
                name: name.to_string(),
                secret: decode_fixed::<32>("k", private_key).unwrap(),
                passphrase: passphrase.to_string(),
                unlocked: Mutex::new(false),
                fail_lock: false,
                fail_sign: false,
                protecting: false,
                calls: Mutex::new(vec![]),
                timeouts: Mutex::new(vec![]),
            }
        }

        pub fn is_locked(&self) -> bool {
            !*self.unlocked.lock().unwrap()
        }
    }

    impl KeyHolder for MockHolder {
        fn name(&self) -> String {
            self.name.clone()
        }
        fn public_key(&self) -> Option<BlsPublicKey> {
            let sk = blst::min_pk::SecretKey::from_bytes(&self.secret).unwrap();
            Some(FixedBytes(sk.sk_to_pk().compress()))
        }
        fn as_signer(&self) -> Option<&dyn Signer> {
            Some(self)
        }
        fn as_protecting_signer(&self) -> Option<&dyn ProtectingSigner> {
            match self.protecting {
                true => Some(self),
                false => None,
            }
        }
        fn as_lockable(&self) -> Option<&dyn Lockable> {
            Some(self)
        }
    }

    impl Signer for MockHolder {
        fn sign(&self, signing_root: &B256, timeout: Duration) -> eyre::Result<BlsSignature> {
            self.timeouts.lock().unwrap().push(timeout);
            self.calls.lock().unwrap().push("sign");
            if self.fail_sign {
                eyre::bail!("remote signer unavailable");
            }
            sign_with_secret(&self.secret, signing_root.as_slice())
        }
    }

    impl ProtectingSigner for MockHolder {
        fn sign_generic(
            &self,
            object_root: &B256,
            domain: &B256,
            timeout: Duration,
        ) -> eyre::Result<BlsSignature> {
            self.timeouts.lock().unwrap().push(timeout);
            self.calls.lock().unwrap().push("sign_generic");
            sign_with_secret(&self.secret, signing_root(object_root, domain).as_slice())
        }
    }

    impl Lockable for MockHolder {
        fn is_unlocked(&self, timeout: Duration) -> eyre::Result<bool> {
            self.timeouts.lock().unwrap().push(timeout);
            Ok(*self.unlocked.lock().unwrap())
        }
        fn unlock(&self, passphrase: &str, timeout: Duration) -> eyre::Result<()> {
            self.timeouts.lock().unwrap().push(timeout);
            if passphrase != self.passphrase {
                eyre::bail!("incorrect passphrase");
            }
            *self.unlocked.lock().unwrap() = true;
            Ok(())
        }
        fn lock(&self, timeout: Duration) -> eyre::Result<()> {
            self.timeouts.lock().unwrap().push(timeout);
            if self.fail_lock {
                eyre::bail!("lock rejected");
            }
            *self.unlocked.lock().unwrap() = false;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct NoSigner;

    impl KeyHolder for NoSigner {
        fn name(&self) -> String {
            "watch-only".to_string()
        }
        fn public_key(&self) -> Option<BlsPublicKey> {
            None
        }
    }

    fn fixture() -> (B256, B256) {
        let domain = deposit_domain(&FixedBytes([0x01, 0x02, 0x03, 0x04]));
        let root = b256!("0x139b510ea7f2788ab82da1f427d6cbe1db147c15a053db738ad5500cd83754a6");
        (root, domain)
    }

    fn passphrases(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn interop_signature() {
        let (root, domain) = fixture();
        let account = Account::from_private_key(INTEROP_0).unwrap();
        let sig = sign_root(&account, &passphrases(&["x"]), &root, &domain, TIMEOUT).unwrap();
        assert_eq!(
            sig.to_string(),
            "0xb7a757a4c506ac6ac5f2d23e065de7d00dc9f5a6a3f9610a8b60b65f166379139ae382c91ecbbf5c9fabc34b1cd2cf8f0211488d50d8754716d8e72e17c1a00b5d9b37cc73767946790ebe66cf9669abfc5c25c67e1e2d1c2e11429d149c25a2",
            "Signature mismatch"
        );
        let pubkey = account.best_public_key().unwrap();
        assert!(verify_root(&pubkey, &root, &domain, &sig).unwrap());
        assert!(
            !verify_root(&pubkey, &root, &B256::ZERO, &sig).unwrap(),
            "signature must not verify under another domain"
        );
        assert!(!verify_root(&pubkey, &root, &domain, &FixedBytes([0u8; 96])).unwrap());
    }

    #[test]
    fn lock_state_restored() {
        let (root, domain) = fixture();
        let holder = Arc::new(MockHolder::new("m", INTEROP_1, "secret"));
        let account = Account::new(holder.clone());

        sign_root(&account, &passphrases(&["bad", "secret"]), &root, &domain, TIMEOUT).unwrap();
        assert!(holder.is_locked(), "locked account must be relocked");

        *holder.unlocked.lock().unwrap() = true;
        sign_root(&account, &[], &root, &domain, TIMEOUT).unwrap();
        assert!(!holder.is_locked(), "unlocked account must stay unlocked");
    }

    #[test]
    fn timeout_reaches_holder() {
        let (root, domain) = fixture();
        let timeout = Duration::from_secs(7);
        for protecting in [false, true] {
            let mut mock = MockHolder::new("m", INTEROP_1, "secret");
            mock.protecting = protecting;
            let holder = Arc::new(mock);
            let account = Account::new(holder.clone());
            sign_root(&account, &passphrases(&["secret"]), &root, &domain, timeout).unwrap();

            let seen = holder.timeouts.lock().unwrap();
            // is_unlocked, unlock, sign, lock
            assert_eq!(seen.len(), 4, "unexpected holder calls");
            assert!(seen.iter().all(|t| *t == timeout), "timeout not forwarded: {:?}", seen);
        }
    }

    #[test]
    fn unlock_failure() {
        let (root, domain) = fixture();
        let holder = Arc::new(MockHolder::new("m", INTEROP_1, "secret"));
        let account = Account::new(holder.clone());
        let res = sign_root(&account, &passphrases(&["a", "b"]), &root, &domain, TIMEOUT);
        assert!(matches!(res, Err(Error::UnlockFailed(name)) if name == "m"));
        assert!(holder.calls.lock().unwrap().is_empty(), "signed while locked");
    }

    #[test]
    fn relock_after_signing_failure() {
        let (root, domain) = fixture();
        let mut mock = MockHolder::new("m", INTEROP_1, "secret");
        mock.fail_sign = true;
        let holder = Arc::new(mock);
        let account = Account::new(holder.clone());
        let res = sign_root(&account, &passphrases(&["secret"]), &root, &domain, TIMEOUT);
        assert!(matches!(res, Err(Error::SignerError { .. })));
        assert!(holder.is_locked());
    }

    #[test]
    fn relock_failure_swallowed() {
        let (root, domain) = fixture();
        let mut mock = MockHolder::new("m", INTEROP_1, "secret");
        mock.fail_lock = true;
        let account = Account::new(Arc::new(mock));
        assert!(sign_root(&account, &passphrases(&["secret"]), &root, &domain, TIMEOUT).is_ok());
    }

    #[test]
    fn protecting_signer_preferred() {
        let (root, domain) = fixture();
        let mut mock = MockHolder::new("m", INTEROP_1, "secret");
        mock.protecting = true;
        let holder = Arc::new(mock);
        let account = Account::new(holder.clone());
        assert_eq!(account.signing_mode().unwrap(), SigningMode::Protecting);

        let protected =
            sign_root(&account, &passphrases(&["secret"]), &root, &domain, TIMEOUT).unwrap();
        assert_eq!(*holder.calls.lock().unwrap(), vec!["sign_generic"]);

        let plain = Account::new(Arc::new(
            ScratchAccount::from_private_key(INTEROP_1).unwrap(),
        ));
        let expected = sign_root(&plain, &passphrases(&["x"]), &root, &domain, TIMEOUT).unwrap();
        assert_eq!(protected, expected, "both signing paths must agree");
    }

    #[test]
    fn signing_unsupported() {
        let (root, domain) = fixture();
        let account = Account::new(Arc::new(NoSigner));
        assert!(matches!(
            sign_root(&account, &[], &root, &domain, TIMEOUT),
            Err(Error::SigningUnsupported(_))
        ));
    }

    #[test]
    fn invalid_public_key() {
        let (root, domain) = fixture();
        assert!(matches!(
            verify_root(&FixedBytes([0u8; 48]), &root, &domain, &FixedBytes([0u8; 96])),
            Err(Error::InvalidPublicKey { .. })
        ));
    }
}
