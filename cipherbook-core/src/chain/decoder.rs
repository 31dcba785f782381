//! Market order event decoding.
//!
//! Turns the opaque log entries of a receipt into typed placement,
//! settlement and failure events. Decoding is per entry: a log that is not
//! one of ours, or is malformed, is dropped without affecting the others.

use alloy_primitives::{Address, TxHash};
use alloy_sol_types::SolEvent;
use cipherbook_sdk::objects::TerminalStatus;
use itertools::Itertools;
use tracing::{debug, trace};

use crate::chain::contracts::{OrderFailed, OrderPlaced, OrderSettled};
use crate::chain::receipt::{LogEntry, TransactionReceipt};
use crate::entities::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketOrderEventKind {
    Placed,
    Settled,
    Failed,
}

/// One decoded market order event. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedEvent {
    pub kind: MarketOrderEventKind,
    pub user: Address,
    pub handle: Handle,
    pub transaction_hash: TxHash,
    pub log_index: u64,
}

/// The final outcome a receipt assigns to one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub handle: Handle,
    pub status: TerminalStatus,
    pub user: Address,
    pub log_index: u64,
}

/// Events of one receipt, each category in ascending log order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedReceipt {
    pub placed: Vec<ParsedEvent>,
    pub settled: Vec<ParsedEvent>,
    pub failed: Vec<ParsedEvent>,
}

impl DecodedReceipt {
    pub fn len(&self) -> usize {
        self.placed.len() + self.settled.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Settlement and failure events collapsed per handle.
    ///
    /// When one receipt carries several outcomes for the same handle the
    /// one with the highest log index wins. The result is ordered by that
    /// winning log index.
    pub fn resolutions(&self) -> Vec<Resolution> {
        let mut latest: Vec<Resolution> = Vec::new();
        let outcomes = self
            .settled
            .iter()
            .chain(self.failed.iter())
            .sorted_by_key(|event| event.log_index);

        for event in outcomes {
            let status = match event.kind {
                MarketOrderEventKind::Settled => TerminalStatus::Completed,
                MarketOrderEventKind::Failed => TerminalStatus::Failed,
                MarketOrderEventKind::Placed => continue,
            };
            let resolution = Resolution {
                handle: event.handle,
                status,
                user: event.user,
                log_index: event.log_index,
            };
            latest.retain(|r| r.handle != event.handle);
            latest.push(resolution);
        }

        latest
    }
}

/// Decodes `OrderPlaced` / `OrderSettled` / `OrderFailed` logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDecoder {
    /// Only logs emitted by this contract are considered, when set.
    contract: Option<Address>,
}

impl EventDecoder {
    pub fn new(contract: Option<Address>) -> Self {
        Self { contract }
    }

    /// Decode every recognisable market order event in `receipt`.
    ///
    /// With `user_filter`, events for any other user are left out of all
    /// three categories.
    pub fn decode(&self, receipt: &TransactionReceipt, user_filter: Option<Address>) -> DecodedReceipt {
        self.decode_logs(receipt.transaction_hash, &receipt.logs, user_filter)
    }

    /// Like [`decode`](Self::decode), for logs of `tx` obtained some other
    /// way.
    pub fn decode_logs(
        &self,
        tx: TxHash,
        logs: &[LogEntry],
        user_filter: Option<Address>,
    ) -> DecodedReceipt {
        let mut decoded = DecodedReceipt::default();

        let entries = logs
            .iter()
            .enumerate()
            .map(|(position, log)| {
                let index = log
                    .log_index
                    .map(|index| index.to::<u64>())
                    .unwrap_or(position as u64);
                (index, log)
            })
            .sorted_by_key(|(index, _)| *index);

        for (log_index, log) in entries {
            if self.contract.is_some_and(|contract| contract != log.address) {
                continue;
            }
            let Some((kind, user, handle)) = decode_entry(log) else {
                trace!(
                    tx = %tx,
                    log_index,
                    "Skipping log that is not a market order event"
                );
                continue;
            };
            if user_filter.is_some_and(|filter| filter != user) {
                continue;
            }

            let event = ParsedEvent {
                kind,
                user,
                handle,
                transaction_hash: tx,
                log_index,
            };
            match kind {
                MarketOrderEventKind::Placed => decoded.placed.push(event),
                MarketOrderEventKind::Settled => decoded.settled.push(event),
                MarketOrderEventKind::Failed => decoded.failed.push(event),
            }
        }

        if !decoded.is_empty() {
            debug!(
                tx = %tx,
                placed = decoded.placed.len(),
                settled = decoded.settled.len(),
                failed = decoded.failed.len(),
                "Decoded market order events"
            );
        }

        decoded
    }
}

fn decode_entry(log: &LogEntry) -> Option<(MarketOrderEventKind, Address, Handle)> {
    let topic0 = *log.topics.first()?;
    let topics = log.topics.iter().copied();

    if topic0 == OrderPlaced::SIGNATURE_HASH {
        let event = OrderPlaced::decode_raw_log(topics, &log.data).ok()?;
        Some((MarketOrderEventKind::Placed, event.user, event.handle))
    } else if topic0 == OrderSettled::SIGNATURE_HASH {
        let event = OrderSettled::decode_raw_log(topics, &log.data).ok()?;
        Some((MarketOrderEventKind::Settled, event.user, event.handle))
    } else if topic0 == OrderFailed::SIGNATURE_HASH {
        let event = OrderFailed::decode_raw_log(topics, &log.data).ok()?;
        Some((MarketOrderEventKind::Failed, event.user, event.handle))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HOOK, USER_1, USER_2, failed_log, placed_log, receipt, settled_log, tx};
    use alloy_primitives::{B256, Bytes, U256, address};

    #[test]
    fn test_decode_categorizes_in_log_order() {
        let r = receipt(
            tx(1),
            vec![
                placed_log(USER_1, 7),
                settled_log(USER_2, 3),
                failed_log(USER_1, 4),
                settled_log(USER_1, 5),
            ],
        );
        let decoded = EventDecoder::new(Some(HOOK)).decode(&r, None);

        assert_eq!(decoded.placed.len(), 1);
        assert_eq!(decoded.placed[0].handle, U256::from(7));
        assert_eq!(decoded.placed[0].transaction_hash, tx(1));
        let settled: Vec<_> = decoded.settled.iter().map(|e| e.log_index).collect();
        assert_eq!(settled, vec![1, 3]);
        assert_eq!(decoded.failed[0].log_index, 2);
    }

    #[test]
    fn test_user_filter_applies_to_every_category() {
        let r = receipt(
            tx(1),
            vec![
                placed_log(USER_2, 1),
                settled_log(USER_2, 2),
                failed_log(USER_2, 3),
                settled_log(USER_1, 4),
            ],
        );
        let decoded = EventDecoder::new(None).decode(&r, Some(USER_1));

        assert!(decoded.placed.is_empty());
        assert!(decoded.failed.is_empty());
        assert_eq!(decoded.settled.len(), 1);
        assert_eq!(decoded.settled[0].user, USER_1);
    }

    #[test]
    fn test_malformed_and_foreign_logs_are_isolated() {
        let mut truncated = settled_log(USER_1, 9);
        truncated.data = Bytes::from_static(&[0x01, 0x02]);
        let foreign = LogEntry {
            address: HOOK,
            topics: vec![B256::repeat_byte(0xee)],
            data: Bytes::new(),
            log_index: None,
        };
        let no_topics = LogEntry {
            address: HOOK,
            topics: vec![],
            data: Bytes::new(),
            log_index: None,
        };
        let r = receipt(
            tx(1),
            vec![truncated, foreign, no_topics, placed_log(USER_1, 10)],
        );

        let decoded = EventDecoder::new(None).decode(&r, None);
        assert!(decoded.settled.is_empty());
        assert_eq!(decoded.placed.len(), 1);
        assert_eq!(decoded.placed[0].log_index, 3);
    }

    #[test]
    fn test_contract_filter_drops_other_emitters() {
        let mut spoofed = settled_log(USER_1, 1);
        spoofed.address = address!("0x00000000000000000000000000000000deadbeef");
        let r = receipt(tx(1), vec![spoofed, settled_log(USER_1, 2)]);

        let decoded = EventDecoder::new(Some(HOOK)).decode(&r, None);
        assert_eq!(decoded.settled.len(), 1);
        assert_eq!(decoded.settled[0].handle, U256::from(2));

        let decoded = EventDecoder::new(None).decode(&r, None);
        assert_eq!(decoded.settled.len(), 2);
    }

    #[test]
    fn test_rpc_log_index_takes_precedence_over_position() {
        let mut late = settled_log(USER_1, 1);
        late.log_index = Some(alloy_primitives::U64::from(40));
        let mut early = failed_log(USER_1, 1);
        early.log_index = Some(alloy_primitives::U64::from(12));
        let r = receipt(tx(1), vec![late, early]);

        let decoded = EventDecoder::new(None).decode(&r, None);
        assert_eq!(decoded.failed[0].log_index, 12);
        assert_eq!(decoded.settled[0].log_index, 40);

        let resolutions = decoded.resolutions();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].status, TerminalStatus::Completed);
    }

    #[test]
    fn test_resolutions_last_writer_wins_per_handle() {
        let r = receipt(
            tx(1),
            vec![
                settled_log(USER_1, 10),
                failed_log(USER_1, 20),
                failed_log(USER_1, 10),
            ],
        );
        let resolutions = EventDecoder::new(None).decode(&r, None).resolutions();

        assert_eq!(resolutions.len(), 2);
        assert_eq!(resolutions[0].handle, U256::from(20));
        assert_eq!(resolutions[0].status, TerminalStatus::Failed);
        assert_eq!(resolutions[1].handle, U256::from(10));
        assert_eq!(resolutions[1].status, TerminalStatus::Failed);
        assert_eq!(resolutions[1].log_index, 2);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let r = receipt(tx(3), vec![placed_log(USER_1, 1), settled_log(USER_1, 1)]);
        let decoder = EventDecoder::new(Some(HOOK));
        assert_eq!(decoder.decode(&r, None), decoder.decode(&r, None));
    }
}
