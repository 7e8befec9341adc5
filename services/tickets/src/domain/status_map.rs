//! Gateway status names → internal payment status.

use oasis_domain::payment::{PaymentMethod, PaymentStatus};

/// Lookup table keyed by `(method, gateway status name)`.
///
/// Cashier payments are settled at the point of sale and have no entries.
const GATEWAY_STATUS_TABLE: &[(PaymentMethod, &str, PaymentStatus)] = &[
    (PaymentMethod::Gateway, "pending", PaymentStatus::Created),
    (PaymentMethod::Gateway, "approved", PaymentStatus::Approved),
    (PaymentMethod::Gateway, "authorized", PaymentStatus::Processing),
    (PaymentMethod::Gateway, "in_process", PaymentStatus::Processing),
    (PaymentMethod::Gateway, "in_mediation", PaymentStatus::Processing),
    (PaymentMethod::Gateway, "rejected", PaymentStatus::Rejected),
    (PaymentMethod::Gateway, "cancelled", PaymentStatus::Rejected),
    (PaymentMethod::Gateway, "refunded", PaymentStatus::Reversed),
    (PaymentMethod::Gateway, "charged_back", PaymentStatus::Reversed),
];

/// `None` for names the table does not know; callers must not guess.
pub fn map_gateway_status(method: PaymentMethod, name: &str) -> Option<PaymentStatus> {
    GATEWAY_STATUS_TABLE
        .iter()
        .find(|(m, n, _)| *m == method && *n == name)
        .map(|(_, _, status)| *status)
}
