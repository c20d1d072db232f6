use std::fmt::{Debug, Display};
use std::future::Future;

#[derive(Debug)]
pub enum TransferOutcome<T, O, E> {
    Succeeded { item: T, output: O },
    Failed { item: T, error: E },
}

impl<T, O, E> TransferOutcome<T, O, E> {
    pub fn item(&self) -> &T {
        match self {
            TransferOutcome::Succeeded { item, .. } => item,
            TransferOutcome::Failed { item, .. } => item,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Succeeded { .. })
    }
}

/// One outcome per input item, in input order.
#[derive(Debug)]
pub struct BatchReport<T, O, E> {
    outcomes: Vec<TransferOutcome<T, O, E>>,
}

impl<T, O, E> BatchReport<T, O, E> {
    pub fn outcomes(&self) -> &[TransferOutcome<T, O, E>] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&T, &E)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            TransferOutcome::Failed { item, error } => Some((item, error)),
            TransferOutcome::Succeeded { .. } => None,
        })
    }
}

/// Runs `operation` once for every item, one after another.
///
/// A failing item is recorded and the batch moves on; nothing already
/// transferred is rolled back.
pub async fn transfer<T, O, E, F, Fut>(items: Vec<T>, mut operation: F) -> BatchReport<T, O, E>
where
    T: Debug,
    E: Display,
    F: FnMut(&T) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    log::info!("Starting batch transfer of {} items", items.len());

    let mut outcomes = Vec::with_capacity(items.len());

    for item in items {
        log::debug!("Transfer started for: {:?}", item);

        match operation(&item).await {
            Ok(output) => {
                log::debug!("Transfer finished for: {:?}", item);
                outcomes.push(TransferOutcome::Succeeded { item, output });
            }
            Err(error) => {
                log::warn!("Transfer failed for {:?}: {}", item, error);
                outcomes.push(TransferOutcome::Failed { item, error });
            }
        }
    }

    let report = BatchReport { outcomes };
    log::info!(
        "Batch transfer complete: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );

    report
}
