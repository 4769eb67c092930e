use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Card,
    Paypal,
    ApplePay,
    GooglePay,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: Id<PaymentMethod>,
    pub kind: PaymentKind,
    pub last4: Option<String>,
    pub brand: Option<String>,
    pub is_default: bool,
}

impl HasId for PaymentMethod {
    type IdType = String;
}

impl PaymentMethod {
    /// Label shown in payment pickers, e.g. `Visa •••• 4242`.
    pub fn display_name(&self) -> String {
        match self.kind {
            PaymentKind::Card => format!(
                "{} •••• {}",
                self.brand.as_deref().unwrap_or("Card"),
                self.last4.as_deref().unwrap_or("????")
            ),
            PaymentKind::Paypal => "PayPal".to_owned(),
            PaymentKind::ApplePay => "Apple Pay".to_owned(),
            PaymentKind::GooglePay => "Google Pay".to_owned(),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMethod {
    pub kind: PaymentKind,
    pub last4: Option<String>,
    pub brand: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_label_shows_brand_and_last_digits() {
        let card = PaymentMethod {
            id: Id::new("1".to_owned()),
            kind: PaymentKind::Card,
            last4: Some("4242".to_owned()),
            brand: Some("Visa".to_owned()),
            is_default: true,
        };
        assert_eq!(card.display_name(), "Visa •••• 4242");
    }

    #[test]
    fn wallets_have_fixed_labels() {
        let wallet = PaymentMethod {
            id: Id::new("2".to_owned()),
            kind: PaymentKind::ApplePay,
            last4: None,
            brand: None,
            is_default: false,
        };
        assert_eq!(wallet.display_name(), "Apple Pay");
    }
}
