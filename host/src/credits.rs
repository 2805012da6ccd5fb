//! `do_add_credit`: tops up a user's inference credit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bridge_ledger::CreditLedger;
use bridge_types::{Identity, Timestamp};

use crate::{HostError, HostFunction, HostFunctionDescriptor};

#[derive(Deserialize)]
struct AddCreditInput {
    user_did: String,
    credit: f64,
}

#[derive(Serialize)]
struct AddCreditOutput<'a> {
    user_did: &'a str,
    credit: u64,
}

pub struct AddCreditAction {
    ledger: CreditLedger,
}

impl AddCreditAction {
    pub const NAME: &'static str = "do_add_credit";

    pub fn new(ledger: CreditLedger) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl HostFunction for AddCreditAction {
    fn descriptor(&self) -> HostFunctionDescriptor {
        HostFunctionDescriptor::input_only(Self::NAME)
    }

    async fn call(&self, input: &[u8]) -> Result<String, HostError> {
        let input: AddCreditInput =
            serde_json::from_slice(input).map_err(|e| HostError::decode(Self::NAME, e))?;
        let user = Identity::parse(&input.user_did).map_err(|e| HostError::decode(Self::NAME, e))?;
        if !input.credit.is_finite() || input.credit < 0.0 || input.credit >= u64::MAX as f64 {
            return Err(HostError::decode(
                Self::NAME,
                format!("credit {} out of range", input.credit),
            ));
        }
        // Fractional credit is truncated.
        let amount = input.credit.trunc() as u64;

        let balance = self.ledger.add(&user, amount, Timestamp::now())?;
        serde_json::to_string(&AddCreditOutput {
            user_did: user.as_str(),
            credit: balance.balance,
        })
        .map_err(|e| HostError::decode(Self::NAME, e))
    }
}
