//! Account bootstrap and queries.

use tracing::info;

use crate::accounts::{Account, BOOTSTRAP_ACCOUNTS};
use crate::{EngineError, Ledger, Money, ResultEngine, index};

use super::{Engine, Page, account_key, require_filled};

impl<L: Ledger> Engine<L> {
    /// Writes the fixed initial account set: the administrator with zero
    /// balance plus the funded proprietors. Runs once; a populated ledger
    /// is rejected.
    pub fn bootstrap(&mut self) -> ResultEngine<Vec<Account>> {
        let (admin_id, _, _) = BOOTSTRAP_ACCOUNTS[0];
        if self.read_json::<Account>(&account_key(admin_id)?)?.is_some() {
            return Err(EngineError::ExistingKey(admin_id.to_string()));
        }

        let mut accounts = Vec::with_capacity(BOOTSTRAP_ACCOUNTS.len());
        for (account_id, display_name, balance) in BOOTSTRAP_ACCOUNTS {
            let account = Account {
                account_id: account_id.to_string(),
                display_name: display_name.to_string(),
                balance: Money::new(balance),
            };
            self.write_json(&account_key(account_id)?, &account)?;
            accounts.push(account);
        }
        info!(count = accounts.len(), "ledger bootstrapped");
        Ok(accounts)
    }

    /// Looks up a single account.
    pub fn account(&self, account_id: &str) -> ResultEngine<Account> {
        let account_id = require_filled(account_id, "account id")?;
        self.require_json(&account_key(account_id)?, account_id)
    }

    /// Lists accounts, paginated.
    pub fn account_list(
        &self,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<Account>> {
        self.scan_json(&index::key(index::ACCOUNT, &[])?, page_size, bookmark)
    }
}
