//! Pure unit tests: state machine table, payout detail validation and
//! enum/string mappings. No database required.

use rust_decimal::Decimal;
use settlement_backend::models::*;
use uuid::Uuid;

mod helpers;
use helpers::dec;

// =============================================================================
// WITHDRAWAL STATE MACHINE
// =============================================================================

#[test]
fn test_withdrawal_transition_table() {
    use WithdrawalStatus::*;

    let all = [Pending, Approved, Processing, Completed, Rejected, Cancelled];
    let allowed = [
        (Pending, Approved),
        (Pending, Rejected),
        (Pending, Cancelled),
        (Approved, Processing),
        (Approved, Completed),
        (Approved, Rejected),
        (Processing, Completed),
        (Processing, Rejected),
    ];

    for from in all {
        for to in all {
            let expected = allowed.contains(&(from, to));
            assert_eq!(
                from.can_transition_to(to),
                expected,
                "transition {:?} -> {:?}",
                from,
                to
            );
        }
    }
}

#[test]
fn test_terminal_states_have_no_exits() {
    use WithdrawalStatus::*;

    for terminal in [Completed, Rejected, Cancelled] {
        assert!(terminal.is_terminal());
        for to in [Pending, Approved, Processing, Completed, Rejected, Cancelled] {
            assert!(!terminal.can_transition_to(to));
        }
    }

    for open in [Pending, Approved, Processing] {
        assert!(!open.is_terminal());
    }
}

#[test]
fn test_open_states_lock_funds() {
    use WithdrawalStatus::*;

    for status in [Pending, Approved, Processing] {
        assert!(status.locks_funds());
    }
    for status in [Completed, Rejected, Cancelled] {
        assert!(!status.locks_funds());
    }
}

#[test]
fn test_withdrawal_status_string_round_trip() {
    use WithdrawalStatus::*;

    for status in [Pending, Approved, Processing, Completed, Rejected, Cancelled] {
        assert_eq!(WithdrawalStatus::from_str(status.as_str()), Some(status));
    }
    assert_eq!(WithdrawalStatus::from_str("refunded"), None);
}

// =============================================================================
// TRANSACTION ENUMS
// =============================================================================

#[test]
fn test_transaction_type_credit_and_inverse() {
    use TransactionType::*;

    assert!(Received.is_credit());
    assert!(Bonus.is_credit());
    assert!(Pending.is_credit());
    assert!(!Deducted.is_credit());

    assert_eq!(Received.inverse(), Deducted);
    assert_eq!(Bonus.inverse(), Deducted);
    assert_eq!(Pending.inverse(), Deducted);
    assert_eq!(Deducted.inverse(), Received);
}

#[test]
fn test_transaction_enum_string_round_trips() {
    use TransactionCategory as Cat;
    use TransactionStatus as St;
    use TransactionType as Ty;

    for ty in [Ty::Received, Ty::Pending, Ty::Deducted, Ty::Bonus] {
        assert_eq!(Ty::from_str(ty.as_str()), Some(ty));
    }
    for st in [St::Completed, St::Pending, St::Failed, St::Reversed] {
        assert_eq!(St::from_str(st.as_str()), Some(st));
    }
    for cat in [
        Cat::OrderEarning,
        Cat::DeliveryFee,
        Cat::Withdrawal,
        Cat::Bonus,
        Cat::Refund,
        Cat::Adjustment,
    ] {
        assert_eq!(Cat::from_str(cat.as_str()), Some(cat));
    }

    assert_eq!(Ty::from_str("transfer"), None);
    assert_eq!(Cat::from_str("order"), None);
}

#[test]
fn test_display_labels() {
    assert_eq!(WithdrawalStatus::Pending.display_label(), "Pending review");
    assert_eq!(
        WithdrawalStatus::Processing.display_label(),
        "Payout in progress"
    );
    assert_eq!(TransactionStatus::Reversed.display_label(), "Reversed");
    assert_eq!(
        TransactionCategory::OrderEarning.display_label(),
        "Order earning"
    );
    assert_eq!(
        TransactionCategory::DeliveryFee.display_label(),
        "Delivery fee"
    );
}

#[test]
fn test_account_type_string_round_trip() {
    for ty in [AccountType::Seller, AccountType::DeliveryPartner] {
        assert_eq!(AccountType::from_str(ty.as_str()), Some(ty));
    }
    assert_eq!(AccountType::from_str("customer"), None);
}

#[test]
fn test_signed_amount_by_type() {
    let base = WalletTransaction {
        id: Uuid::new_v4(),
        wallet_id: Uuid::new_v4(),
        amount: dec("150.25"),
        transaction_type: "received".to_string(),
        status: "completed".to_string(),
        category: "order_earning".to_string(),
        reference_id: None,
        description: None,
        reversal_of: None,
        created_at: chrono::Utc::now().naive_utc(),
    };

    assert_eq!(base.signed_amount(), dec("150.25"));
    assert!(base.is_completed());

    let debit = WalletTransaction {
        transaction_type: "deducted".to_string(),
        category: "withdrawal".to_string(),
        ..base.clone()
    };
    assert_eq!(debit.signed_amount(), dec("-150.25"));

    let bonus = WalletTransaction {
        transaction_type: "bonus".to_string(),
        category: "bonus".to_string(),
        ..base
    };
    assert_eq!(bonus.signed_amount(), dec("150.25"));
}

// =============================================================================
// ACCOUNT DETAILS
// =============================================================================

#[test]
fn test_bank_details_validation() {
    let valid = AccountDetails::BankTransfer {
        account_holder: "Asha Rao".to_string(),
        account_number: "123456789012".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
        bank_name: None,
    };
    assert!(valid.validate().is_ok());
    assert_eq!(valid.method(), PaymentMethod::BankTransfer);

    let blank_holder = AccountDetails::BankTransfer {
        account_holder: "  ".to_string(),
        account_number: "123456789012".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
        bank_name: None,
    };
    assert!(blank_holder.validate().is_err());

    let non_numeric = AccountDetails::BankTransfer {
        account_holder: "Asha Rao".to_string(),
        account_number: "12345ABC".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
        bank_name: None,
    };
    assert!(non_numeric.validate().is_err());

    let too_short = AccountDetails::BankTransfer {
        account_holder: "Asha Rao".to_string(),
        account_number: "12345".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
        bank_name: None,
    };
    assert!(too_short.validate().is_err());

    let bad_ifsc = AccountDetails::BankTransfer {
        account_holder: "Asha Rao".to_string(),
        account_number: "123456789012".to_string(),
        ifsc_code: "HDFC-1234".to_string(),
        bank_name: None,
    };
    assert!(bad_ifsc.validate().is_err());
}

#[test]
fn test_upi_details_validation() {
    let valid = AccountDetails::Upi {
        upi_id: "seller@okbank".to_string(),
    };
    assert!(valid.validate().is_ok());
    assert_eq!(valid.method(), PaymentMethod::Upi);

    for bad in ["sellerokbank", "@okbank", "seller@", ""] {
        let details = AccountDetails::Upi {
            upi_id: bad.to_string(),
        };
        assert!(details.validate().is_err(), "expected rejection of {:?}", bad);
    }
}

#[test]
fn test_account_details_json_shape() {
    let upi = AccountDetails::Upi {
        upi_id: "seller@okbank".to_string(),
    };
    let value = serde_json::to_value(&upi).unwrap();
    assert_eq!(value["payment_method"], "upi");
    assert_eq!(value["upi_id"], "seller@okbank");

    let bank = AccountDetails::BankTransfer {
        account_holder: "Asha Rao".to_string(),
        account_number: "123456789012".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
        bank_name: None,
    };
    let value = serde_json::to_value(&bank).unwrap();
    assert_eq!(value["payment_method"], "bank_transfer");
    assert!(value.get("bank_name").is_none());

    let parsed: AccountDetails = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, bank);
}

#[test]
fn test_decimal_parsing_helper() {
    assert_eq!(dec("0"), Decimal::ZERO);
    assert_eq!(dec("100.5") + dec("0.5"), dec("101"));
}
