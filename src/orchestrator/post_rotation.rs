//! Serialized DNS and certificate updates after successful rotations.
//!
//! A single worker task owns both collaborators and is fed the newest identity through a
//! `watch` channel. Updates therefore never overlap, and identities superseded while an update
//! is in flight are skipped, so the last identity written is always the latest one committed.

use log::{debug, info, warn};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::collaborators::{CertificateRotator, DnsUpdater};

pub struct PostRotationWorker {
    latest: watch::Sender<Option<IpAddr>>,
    handle: JoinHandle<()>,
}

impl PostRotationWorker {
    /// Spawns the worker, or returns `None` when there is nothing to notify.
    pub fn spawn(
        dns: Option<Arc<dyn DnsUpdater>>,
        certificates: Option<Arc<dyn CertificateRotator>>,
    ) -> Option<Self> {
        if dns.is_none() && certificates.is_none() {
            return None;
        }
        let (latest, receiver) = watch::channel(None);
        let handle = tokio::spawn(run_worker(receiver, dns, certificates));
        Some(Self { latest, handle })
    }

    /// Queues `identity`, replacing any identity not yet picked up. Never waits.
    pub fn notify(&self, identity: IpAddr) {
        self.latest.send_replace(Some(identity));
    }

    /// Lets the worker finish the pending update, then stops it.
    pub async fn close(self) {
        let Self { latest, handle } = self;
        drop(latest);
        if let Err(e) = handle.await {
            warn!("Post-rotation worker failed: {}", e);
        }
    }
}

async fn run_worker(
    mut latest: watch::Receiver<Option<IpAddr>>,
    dns: Option<Arc<dyn DnsUpdater>>,
    certificates: Option<Arc<dyn CertificateRotator>>,
) {
    while latest.changed().await.is_ok() {
        let Some(identity) = *latest.borrow_and_update() else {
            continue;
        };
        debug!("Post-rotation updates for {}", identity);

        if let Some(dns) = &dns {
            if let Err(e) = dns.update(identity).await {
                warn!("DNS update to {} failed: {}", identity, e);
            }
        }

        if let Some(certificates) = &certificates {
            match certificates.rotate().await {
                Ok(paths) => info!(
                    "TLS identity rotated: {}, {}",
                    paths.cert_path.display(),
                    paths.key_path.display()
                ),
                Err(e) => warn!("TLS certificate rotation failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::CollaboratorError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records written identities; the first update is slow.
    #[derive(Default)]
    struct SlowFirstDns {
        written: Mutex<Vec<IpAddr>>,
        in_flight: Mutex<u32>,
        max_in_flight: Mutex<u32>,
    }

    #[async_trait]
    impl DnsUpdater for SlowFirstDns {
        async fn update(&self, new_identity: IpAddr) -> Result<(), CollaboratorError> {
            {
                let mut in_flight = self.in_flight.lock().unwrap();
                *in_flight += 1;
                let mut max = self.max_in_flight.lock().unwrap();
                *max = (*max).max(*in_flight);
            }
            let first = self.written.lock().unwrap().is_empty();
            let delay = if first { 30 } else { 1 };
            tokio::time::sleep(Duration::from_secs(delay)).await;
            self.written.lock().unwrap().push(new_identity);
            *self.in_flight.lock().unwrap() -= 1;
            Ok(())
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_no_collaborators_no_worker() {
        assert!(PostRotationWorker::spawn(None, None).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_committed_identity_is_written_last() {
        let dns = Arc::new(SlowFirstDns::default());
        let worker = PostRotationWorker::spawn(Some(dns.clone()), None).unwrap();

        worker.notify(ip("10.0.0.2"));
        // Let the slow update start before the next rotation commits.
        tokio::time::sleep(Duration::from_secs(10)).await;
        worker.notify(ip("10.0.0.3"));
        worker.close().await;

        let written = dns.written.lock().unwrap().clone();
        assert_eq!(written, vec![ip("10.0.0.2"), ip("10.0.0.3")]);
        assert_eq!(*dns.max_in_flight.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_identity_is_skipped() {
        let dns = Arc::new(SlowFirstDns::default());
        let worker = PostRotationWorker::spawn(Some(dns.clone()), None).unwrap();

        worker.notify(ip("10.0.0.2"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        worker.notify(ip("10.0.0.3"));
        worker.notify(ip("10.0.0.1"));
        worker.close().await;

        let written = dns.written.lock().unwrap().clone();
        assert_eq!(written, vec![ip("10.0.0.2"), ip("10.0.0.1")]);
    }
}
