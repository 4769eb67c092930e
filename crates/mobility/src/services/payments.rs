use std::sync::Arc;

use model::payment::{NewPaymentMethod, PaymentMethod};
use utility::id::Id;

use super::Document;
use crate::{
    store::{keys, PersistenceStore},
    MobilityError, MobilityResult,
};

/// Saved payment methods. Exactly one method is the default as long as any
/// are stored. Nothing is charged here.
#[derive(Clone)]
pub struct PaymentMethods {
    methods: Document<Vec<PaymentMethod>>,
}

impl PaymentMethods {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            methods: Document::new(store, keys::PAYMENT_METHODS),
        }
    }

    pub async fn list(&self) -> MobilityResult<Vec<PaymentMethod>> {
        self.methods.read().await
    }

    /// Adds a method. The first method added becomes the default.
    pub async fn add(&self, method: NewPaymentMethod) -> MobilityResult<PaymentMethod> {
        if let Some(last4) = &method.last4 {
            if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
                return Err(MobilityError::invalid_input(format!(
                    "last4 must be four digits, got {:?}",
                    last4
                )));
            }
        }
        self.methods
            .update(|methods| {
                let method = PaymentMethod {
                    id: Id::generate(),
                    kind: method.kind,
                    last4: method.last4,
                    brand: method.brand,
                    is_default: methods.is_empty(),
                };
                methods.push(method.clone());
                Ok(method)
            })
            .await
    }

    /// Removes a method. Removing the default hands the default over to the
    /// first remaining method.
    pub async fn remove(&self, id: &Id<PaymentMethod>) -> MobilityResult<()> {
        self.methods
            .update(|methods| {
                let index = methods
                    .iter()
                    .position(|method| &method.id == id)
                    .ok_or(MobilityError::NotFound)?;
                let removed = methods.remove(index);
                if removed.is_default {
                    if let Some(next) = methods.first_mut() {
                        next.is_default = true;
                    }
                }
                Ok(())
            })
            .await
    }

    pub async fn set_default(&self, id: &Id<PaymentMethod>) -> MobilityResult<PaymentMethod> {
        self.methods
            .update(|methods| {
                if !methods.iter().any(|method| &method.id == id) {
                    return Err(MobilityError::NotFound);
                }
                for method in methods.iter_mut() {
                    method.is_default = &method.id == id;
                }
                methods
                    .iter()
                    .find(|method| method.is_default)
                    .cloned()
                    .ok_or(MobilityError::NotFound)
            })
            .await
    }

    pub async fn default_method(&self) -> MobilityResult<Option<PaymentMethod>> {
        Ok(self
            .methods
            .read()
            .await?
            .into_iter()
            .find(|method| method.is_default))
    }
}

#[cfg(test)]
mod tests {
    use model::payment::PaymentKind;

    use super::*;
    use crate::store::MemoryStore;

    fn card(last4: &str) -> NewPaymentMethod {
        NewPaymentMethod {
            kind: PaymentKind::Card,
            last4: Some(last4.to_owned()),
            brand: Some("Visa".to_owned()),
        }
    }

    fn wallet(kind: PaymentKind) -> NewPaymentMethod {
        NewPaymentMethod {
            kind,
            last4: None,
            brand: None,
        }
    }

    fn payments() -> PaymentMethods {
        PaymentMethods::new(Arc::new(MemoryStore::new()))
    }

    fn defaults(methods: &[PaymentMethod]) -> usize {
        methods.iter().filter(|method| method.is_default).count()
    }

    #[tokio::test]
    async fn first_method_becomes_default() {
        let payments = payments();
        let first = payments.add(card("4242")).await.unwrap();
        let second = payments.add(wallet(PaymentKind::ApplePay)).await.unwrap();
        assert!(first.is_default);
        assert!(!second.is_default);
        assert_eq!(
            payments.default_method().await.unwrap().map(|method| method.id),
            Some(first.id)
        );
    }

    #[tokio::test]
    async fn malformed_card_digits_are_rejected() {
        let result = payments().add(card("42a")).await;
        assert!(matches!(result, Err(MobilityError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn set_default_keeps_exactly_one_default() {
        let payments = payments();
        payments.add(card("4242")).await.unwrap();
        let paypal = payments.add(wallet(PaymentKind::Paypal)).await.unwrap();

        let chosen = payments.set_default(&paypal.id).await.unwrap();
        assert_eq!(chosen.id, paypal.id);
        let methods = payments.list().await.unwrap();
        assert_eq!(defaults(&methods), 1);
        assert_eq!(chosen.display_name(), "PayPal");
    }

    #[tokio::test]
    async fn removing_the_default_promotes_the_next_method() {
        let payments = payments();
        let first = payments.add(card("4242")).await.unwrap();
        let second = payments.add(wallet(PaymentKind::GooglePay)).await.unwrap();

        payments.remove(&first.id).await.unwrap();
        let methods = payments.list().await.unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, second.id);
        assert!(methods[0].is_default);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let payments = payments();
        payments.add(card("4242")).await.unwrap();
        let unknown = Id::new("missing".to_owned());
        assert!(matches!(
            payments.remove(&unknown).await,
            Err(MobilityError::NotFound)
        ));
        assert!(matches!(
            payments.set_default(&unknown).await,
            Err(MobilityError::NotFound)
        ));
        assert_eq!(defaults(&payments.list().await.unwrap()), 1);
    }
}
