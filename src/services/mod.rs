pub mod audit;
pub mod reconciliation;
pub mod settlement;
pub mod withdrawal;

pub use audit::{AuditLogEntry, AuditTrailService};
pub use reconciliation::{ReconciliationReport, ReconciliationService, ReconciliationSummary};
pub use settlement::{
    AdjustmentDirection, ClearancePolicy, ImmediateClearance, ManualClearance, SettlementService,
};
pub use withdrawal::WithdrawalService;
