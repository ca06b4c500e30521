use alloy::primitives::{B256, FixedBytes, hex};
use colored::*;
use eyre::{bail, eyre};
use log::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result, decode_fixed};
use crate::helpers;
use crate::signing::sign_with_secret;

/// Compressed BLS12-381 public key
pub type BlsPublicKey = FixedBytes<48>;
/// Compressed BLS12-381 signature
pub type BlsSignature = FixedBytes<96>;

/// Signs a precomputed signing root.
pub trait Signer {
    fn sign(&self, signing_root: &B256, timeout: Duration) -> eyre::Result<BlsSignature>;
}

/// Signs an object root under a domain, building the signing root itself.
/// Remote signers implement this so they can apply their own slashing and
/// domain checks.
pub trait ProtectingSigner {
    fn sign_generic(
        &self,
        object_root: &B256,
        domain: &B256,
        timeout: Duration,
    ) -> eyre::Result<BlsSignature>;
}

pub trait Lockable {
    fn is_unlocked(&self, timeout: Duration) -> eyre::Result<bool>;
    fn unlock(&self, passphrase: &str, timeout: Duration) -> eyre::Result<()>;
    fn lock(&self, timeout: Duration) -> eyre::Result<()>;
}

/// Anything that holds (or fronts) a validator key. Capabilities are exposed
/// as optional views and captured once when wrapped in an [`Account`].
pub trait KeyHolder: Send + Sync + fmt::Debug {
    fn name(&self) -> String;
    fn wallet(&self) -> Option<String> {
        None
    }
    fn public_key(&self) -> Option<BlsPublicKey>;
    /// Aggregate key of a distributed account
    fn composite_public_key(&self) -> Option<BlsPublicKey> {
        None
    }
    fn as_signer(&self) -> Option<&dyn Signer> {
        None
    }
    fn as_protecting_signer(&self) -> Option<&dyn ProtectingSigner> {
        None
    }
    fn as_lockable(&self) -> Option<&dyn Lockable> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// Holder receives `(object_root, domain)`
    Protecting,
    /// Holder receives the signing root
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub signing: Option<SigningMode>,
    pub lockable: bool,
}

impl Capabilities {
    fn of(holder: &dyn KeyHolder) -> Self {
        // A protecting signer wins when a holder exposes both
        let signing = match (
            holder.as_protecting_signer().is_some(),
            holder.as_signer().is_some(),
        ) {
            (true, _) => Some(SigningMode::Protecting),
            (false, true) => Some(SigningMode::Plain),
            (false, false) => None,
        };
        Capabilities {
            signing,
            lockable: holder.as_lockable().is_some(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    holder: Arc<dyn KeyHolder>,
    caps: Capabilities,
}

impl Account {
    pub fn new(holder: Arc<dyn KeyHolder>) -> Self {
        let caps = Capabilities::of(holder.as_ref());
        trace!("Account {} capabilities: {:?}", holder.name(), caps);
        Account { holder, caps }
    }

    /// Wraps a holder that must be able to sign, rejecting it up front
    /// otherwise.
    pub fn new_signing(holder: Arc<dyn KeyHolder>) -> Result<Self> {
        let account = Account::new(holder);
        account.signing_mode()?;
        Ok(account)
    }

    pub fn from_private_key(private_key: &str) -> Result<Self> {
        Ok(Account::new(Arc::new(ScratchAccount::from_private_key(
            private_key,
        )?)))
    }

    /// `wallet/name`, or just the name for holders outside a wallet
    pub fn label(&self) -> String {
        match self.holder.wallet() {
            Some(wallet) => format!("{}/{}", wallet, self.holder.name()),
            None => self.holder.name(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn signing_mode(&self) -> Result<SigningMode> {
        self.caps
            .signing
            .ok_or_else(|| Error::SigningUnsupported(self.label()))
    }

    pub fn holder(&self) -> &dyn KeyHolder {
        self.holder.as_ref()
    }

    /// Prefers the composite public key when the holder has one.
    pub fn best_public_key(&self) -> Result<BlsPublicKey> {
        self.holder
            .composite_public_key()
            .or_else(|| self.holder.public_key())
            .ok_or_else(|| Error::NoPublicKey(self.label()))
    }
}

/// Account that only lives for the duration of the process, built from a
/// raw private key. Starts locked; any passphrase unlocks it.
pub struct ScratchAccount {
    name: String,
    secret: Vec<u8>,
    pubkey: BlsPublicKey,
    unlocked: Mutex<bool>,
}

impl fmt::Debug for ScratchAccount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ScratchAccount")
            .field("name", &self.name)
            .field("pubkey", &self.pubkey)
            .finish()
    }
}

impl ScratchAccount {
    pub fn new(name: &str, secret: &[u8]) -> Result<Self> {
        let sk = blst::min_pk::SecretKey::from_bytes(secret).map_err(|_| Error::WrongLength {
            field: "private key",
            expected: 32,
            actual: secret.len(),
        })?;
        Ok(ScratchAccount {
            name: name.to_string(),
            secret: secret.to_vec(),
            pubkey: FixedBytes(sk.sk_to_pk().compress()),
            unlocked: Mutex::new(false),
        })
    }

    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let secret = decode_fixed::<32>("private key", private_key)?;
        ScratchAccount::new("scratch", &secret)
    }
}

impl KeyHolder for ScratchAccount {
    fn name(&self) -> String {
        self.name.clone()
    }
    fn public_key(&self) -> Option<BlsPublicKey> {
        Some(self.pubkey)
    }
    fn as_signer(&self) -> Option<&dyn Signer> {
        Some(self)
    }
    fn as_lockable(&self) -> Option<&dyn Lockable> {
        Some(self)
    }
}

impl Signer for ScratchAccount {
    fn sign(&self, signing_root: &B256, timeout: Duration) -> eyre::Result<BlsSignature> {
        if !self.is_unlocked(timeout)? {
            bail!("account {} is locked", self.name);
        }
        sign_with_secret(&self.secret, signing_root.as_slice())
    }
}

impl Lockable for ScratchAccount {
    fn is_unlocked(&self, _timeout: Duration) -> eyre::Result<bool> {
        let unlocked = self
            .unlocked
            .lock()
            .map_err(|_| eyre!("lock state poisoned"))?;
        Ok(*unlocked)
    }
    fn unlock(&self, _passphrase: &str, _timeout: Duration) -> eyre::Result<()> {
        *self
            .unlocked
            .lock()
            .map_err(|_| eyre!("lock state poisoned"))? = true;
        Ok(())
    }
    fn lock(&self, _timeout: Duration) -> eyre::Result<()> {
        *self
            .unlocked
            .lock()
            .map_err(|_| eyre!("lock state poisoned"))? = false;
        Ok(())
    }
}

/// EIP-2335 keystore on disk; the decrypted secret is only held while
/// unlocked.
pub struct KeystoreAccount {
    name: String,
    pubkey: BlsPublicKey,
    keypath: PathBuf,
    secret: Mutex<Vec<u8>>,
}

impl fmt::Debug for KeystoreAccount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeystoreAccount")
            .field("name", &self.name)
            .field("pubkey", &self.pubkey)
            .field("keypath", &self.keypath)
            .finish()
    }
}

impl KeystoreAccount {
    pub fn new(name: &str, pubkey: BlsPublicKey, keypath: PathBuf) -> Self {
        KeystoreAccount {
            name: name.to_string(),
            pubkey,
            keypath,
            secret: Mutex::new(Vec::new()),
        }
    }

    /// Reads name and public key from a keystore file. The name comes from
    /// `name`, then `description`, then the file stem.
    pub fn from_file(keypath: &Path) -> eyre::Result<Self> {
        let json = helpers::json::read(keypath)?;
        let pubkey = json
            .get("pubkey")
            .and_then(|value| value.as_str())
            .ok_or_else(|| eyre!("keystore has no pubkey"))?;
        let pubkey = FixedBytes(decode_fixed::<48>("keystore public key", pubkey)?);
        let stem = keypath
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let name = ["name", "description"]
            .iter()
            .filter_map(|k| json.get(*k).and_then(|value| value.as_str()))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or(stem);
        Ok(KeystoreAccount::new(&name, pubkey, keypath.to_path_buf()))
    }
}

impl KeyHolder for KeystoreAccount {
    fn name(&self) -> String {
        self.name.clone()
    }
    fn public_key(&self) -> Option<BlsPublicKey> {
        Some(self.pubkey)
    }
    fn as_signer(&self) -> Option<&dyn Signer> {
        Some(self)
    }
    fn as_lockable(&self) -> Option<&dyn Lockable> {
        Some(self)
    }
}

impl Signer for KeystoreAccount {
    fn sign(&self, signing_root: &B256, _timeout: Duration) -> eyre::Result<BlsSignature> {
        let secret = self.secret.lock().map_err(|_| eyre!("secret poisoned"))?;
        if secret.is_empty() {
            bail!("account {} is locked", self.name);
        }
        sign_with_secret(&secret, signing_root.as_slice())
    }
}

impl Lockable for KeystoreAccount {
    fn is_unlocked(&self, _timeout: Duration) -> eyre::Result<bool> {
        let secret = self.secret.lock().map_err(|_| eyre!("secret poisoned"))?;
        Ok(!secret.is_empty())
    }

    fn unlock(&self, passphrase: &str, _timeout: Duration) -> eyre::Result<()> {
        let key = eth_keystore::decrypt_key(&self.keypath, passphrase)?;
        let sk = blst::min_pk::SecretKey::from_bytes(&key)
            .map_err(|e| eyre!("keystore holds an invalid key: {:?}", e))?;
        let pubkey = sk.sk_to_pk().compress();
        if pubkey != self.pubkey.0 {
            bail!(
                "keystore {} decrypted to public key {}, expected {}",
                self.keypath.display(),
                hex::encode_prefixed(pubkey),
                self.pubkey
            );
        }
        debug!("unlocked pubkey: {}", self.pubkey);
        *self.secret.lock().map_err(|_| eyre!("secret poisoned"))? = key;
        Ok(())
    }

    fn lock(&self, _timeout: Duration) -> eyre::Result<()> {
        let mut secret = self.secret.lock().map_err(|_| eyre!("secret poisoned"))?;
        *secret = Vec::<u8>::new();
        Ok(())
    }
}

/// Accounts known to the process, keyed by name.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: BTreeMap<String, Account>,
}

impl AccountStore {
    pub fn insert(&mut self, account: Account) {
        let label = account.label();
        if self.accounts.contains_key(&label) {
            warn!("Duplicate account {}, ignoring", label);
            return;
        }
        self.accounts.insert(label, account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Loads every keystore file in `dir`; unreadable files are skipped.
    pub fn load_keystore(dir: &Path) -> eyre::Result<Self> {
        let mut store = AccountStore::default();
        if !dir.exists() {
            debug!("Keystore directory {} does not exist", dir.display());
            return Ok(store);
        }
        for entry in std::fs::read_dir(dir)? {
            let keypath = entry?.path();
            if !keypath.is_file() {
                continue;
            }
            trace!("Reading keystore {}", keypath.display());
            match KeystoreAccount::from_file(&keypath) {
                Ok(account) => store.insert(Account::new(Arc::new(account))),
                Err(e) => warn!(
                    "Skipping keystore {}: {}",
                    keypath.display().to_string().yellow(),
                    e
                ),
            }
        }
        debug!("Loaded {} account(s) from {}", store.len(), dir.display());
        Ok(store)
    }

    /// Resolves one account specifier: a name, a public key or a raw
    /// 32-byte private key.
    pub fn get(&self, spec: &str) -> Result<Account> {
        let spec = spec.trim();
        if let Some(account) = self.accounts.get(spec) {
            return Ok(account.clone());
        }
        let stripped = spec.strip_prefix("0x").unwrap_or(spec);
        match stripped.len() {
            96 => {
                let pubkey = FixedBytes(decode_fixed::<48>("account public key", spec)?);
                self.accounts
                    .values()
                    .find(|a| a.best_public_key().ok() == Some(pubkey))
                    .cloned()
                    .ok_or_else(|| Error::AccountMissing(spec.to_string()))
            }
            64 if spec.starts_with("0x") => Account::from_private_key(spec),
            _ => Err(Error::AccountMissing(spec.to_string())),
        }
    }

    /// Resolves a list of signing account specifiers, `*` meaning every
    /// known account in name order. Input order is preserved.
    pub fn select(&self, specs: &[String]) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for spec in specs {
            match spec.trim() {
                "*" => {
                    for account in self.accounts.values() {
                        accounts.push(Account::new_signing(account.holder.clone())?);
                    }
                }
                spec => accounts.push(Account::new_signing(self.get(spec)?.holder)?),
            }
        }
        if accounts.is_empty() {
            return Err(Error::AccountMissing(specs.join(",")));
        }
        Ok(accounts)
    }
}
