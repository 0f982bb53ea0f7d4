use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::models::user::EmergencyContact;
use crate::observability::metrics::Metrics;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmergencyAlert {
    pub patient_name: String,
    pub hospital_name: String,
    pub hospital_address: String,
}

impl EmergencyAlert {
    pub fn message(&self) -> String {
        format!(
            "EMERGENCY ALERT: {} has been taken to {} located at {}. Please contact them immediately.",
            self.patient_name, self.hospital_name, self.hospital_address
        )
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, contacts: &[EmergencyContact], alert: &EmergencyAlert) -> anyhow::Result<()>;
}

/// Channel for deployments without an SMS gateway: the alert is only logged.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, contacts: &[EmergencyContact], alert: &EmergencyAlert) -> anyhow::Result<()> {
        let recipients: Vec<&str> = contacts.iter().map(|c| c.phone.as_str()).collect();
        info!(
            recipients = %recipients.join(", "),
            message = %alert.message(),
            "sms delivery unsupported here; alert logged"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery. Failures are logged and counted, never returned.
/// Returns `None` when there is nobody to notify.
pub fn dispatch_alert(
    notifier: Arc<dyn Notifier>,
    contacts: Vec<EmergencyContact>,
    alert: EmergencyAlert,
    metrics: Metrics,
) -> Option<JoinHandle<()>> {
    if contacts.is_empty() {
        info!(patient = %alert.patient_name, "no emergency contacts to notify");
        metrics
            .notifications_total
            .with_label_values(&["skipped"])
            .inc();
        return None;
    }

    Some(tokio::spawn(async move {
        let outcome = match notifier.notify(&contacts, &alert).await {
            Ok(()) => {
                info!(recipients = contacts.len(), "emergency contacts notified");
                "sent"
            }
            Err(err) => {
                warn!(error = %err, "failed to notify emergency contacts");
                "failed"
            }
        };
        metrics
            .notifications_total
            .with_label_values(&[outcome])
            .inc();
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::{dispatch_alert, EmergencyAlert, Notifier};
    use crate::models::user::EmergencyContact;
    use crate::observability::metrics::Metrics;

    struct Recording {
        sent: Arc<Mutex<Vec<(Vec<String>, String)>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(
            &self,
            contacts: &[EmergencyContact],
            alert: &EmergencyAlert,
        ) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("gateway unreachable");
            }
            self.sent.lock().unwrap().push((
                contacts.iter().map(|c| c.phone.clone()).collect(),
                alert.message(),
            ));
            Ok(())
        }
    }

    fn alert() -> EmergencyAlert {
        EmergencyAlert {
            patient_name: "Avery".to_string(),
            hospital_name: "General Hospital".to_string(),
            hospital_address: "1 Main St".to_string(),
        }
    }

    fn contact(phone: &str) -> EmergencyContact {
        EmergencyContact {
            id: Uuid::new_v4(),
            name: "Kin".to_string(),
            phone: phone.to_string(),
            relation: "sibling".to_string(),
        }
    }

    #[test]
    fn message_names_patient_and_hospital() {
        assert_eq!(
            alert().message(),
            "EMERGENCY ALERT: Avery has been taken to General Hospital located at 1 Main St. Please contact them immediately."
        );
    }

    #[tokio::test]
    async fn no_contacts_is_a_no_op() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let notifier = Arc::new(Recording {
            sent: sent.clone(),
            fail: false,
        });

        assert!(dispatch_alert(notifier, vec![], alert(), Metrics::new()).is_none());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivers_to_every_contact() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let notifier = Arc::new(Recording {
            sent: sent.clone(),
            fail: false,
        });

        dispatch_alert(
            notifier,
            vec![contact("+1-555-0001"), contact("+1-555-0002")],
            alert(),
            Metrics::new(),
        )
        .unwrap()
        .await
        .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["+1-555-0001", "+1-555-0002"]);
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let metrics = Metrics::new();
        let notifier = Arc::new(Recording {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        });

        let handle = dispatch_alert(notifier, vec![contact("+1-555-0003")], alert(), metrics.clone());
        assert!(handle.unwrap().await.is_ok());
        assert_eq!(
            metrics
                .notifications_total
                .with_label_values(&["failed"])
                .get(),
            1
        );
    }
}
