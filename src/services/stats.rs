//! Listing filters and derived statistics.
//!
//! Everything here is pure computation over already-fetched orders, so
//! the admin listing, the production summary, and the analytics view all
//! share one implementation and cannot disagree with each other.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::lifecycle::OrderStatus;
use crate::services::orders::OrderWithItems;

/// Payment-side listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFilter {
    /// Settled: remaining balance at or below zero.
    Lunas,
    BelumLunas,
}

impl FromStr for PaymentFilter {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "lunas" => Ok(PaymentFilter::Lunas),
            "belum_lunas" => Ok(PaymentFilter::BelumLunas),
            _ => Err(()),
        }
    }
}

/// The three independent listing predicates. `None` means wildcard; a
/// row must match all three.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment: Option<PaymentFilter>,
}

pub fn matches_filter(entry: &OrderWithItems, filter: &ListingFilter) -> bool {
    let order = &entry.order;

    let matches_search = match &filter.search {
        Some(term) if !term.trim().is_empty() => {
            let needle = term.to_lowercase();
            order.client_name.to_lowercase().contains(&needle)
                || order.order_number.to_lowercase().contains(&needle)
        }
        _ => true,
    };

    let matches_status = match filter.status {
        Some(status) => order.current_status == status.to_string(),
        None => true,
    };

    let is_paid = order.remaining_balance <= 0;
    let matches_payment = match filter.payment {
        Some(PaymentFilter::Lunas) => is_paid,
        Some(PaymentFilter::BelumLunas) => !is_paid,
        None => true,
    };

    matches_search && matches_status && matches_payment
}

pub fn filter_orders<'a>(
    orders: &'a [OrderWithItems],
    filter: &ListingFilter,
) -> Vec<&'a OrderWithItems> {
    orders.iter().filter(|o| matches_filter(o, filter)).collect()
}

/// Calendar period selector; month (1-12) and year are independently
/// wildcardable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Period {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

pub fn filter_by_period<'a>(
    orders: &'a [OrderWithItems],
    period: Period,
) -> Vec<&'a OrderWithItems> {
    orders
        .iter()
        .filter(|entry| {
            let created = entry.order.created_at.date_naive();
            let match_month = period.month.map_or(true, |m| created.month() == m);
            let match_year = period.year.map_or(true, |y| created.year() == y);
            match_month && match_year
        })
        .collect()
}

/// Production summary over a period-filtered working set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProductionStats {
    /// Σ grand_total
    pub total_revenue: i64,
    /// Σ dp_amount
    pub total_deposits: i64,
    /// Σ remaining_balance
    pub total_receivables: i64,
    /// Σ item quantities
    pub total_items: i64,
    /// Orders with status in {cutting, production, packing}
    pub active_production_count: u64,
    pub status_counts: BTreeMap<String, u64>,
}

pub fn production_stats(orders: &[&OrderWithItems]) -> ProductionStats {
    let mut stats = ProductionStats::default();

    for entry in orders {
        let order = &entry.order;
        stats.total_revenue += order.grand_total;
        stats.total_deposits += order.dp_amount;
        stats.total_receivables += order.remaining_balance;
        stats.total_items += entry
            .items
            .iter()
            .map(|i| i64::from(i.quantity))
            .sum::<i64>();

        *stats
            .status_counts
            .entry(order.current_status.clone())
            .or_insert(0) += 1;

        if OrderStatus::from_str(&order.current_status)
            .map(OrderStatus::is_active_production)
            .unwrap_or(false)
        {
            stats.active_production_count += 1;
        }
    }

    stats
}

const SHORT_MONTHS_ID: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

/// id-ID short month + 2-digit year, e.g. "Agu 25".
fn month_label(year: i32, month: u32) -> String {
    let name = SHORT_MONTHS_ID[(month - 1) as usize];
    format!("{} {:02}", name, year.rem_euclid(100))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    /// Display label, id-ID short month + 2-digit year.
    pub label: String,
    pub total: i64,
}

/// Revenue grouped by creation month, most recent six distinct months in
/// chronological order. Callers pass non-cancelled orders.
pub fn monthly_revenue_trend(orders: &[&OrderWithItems]) -> Vec<MonthlyRevenue> {
    let mut by_month: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for entry in orders {
        let created = entry.order.created_at.date_naive();
        *by_month
            .entry((created.year(), created.month()))
            .or_insert(0) += entry.order.grand_total;
    }

    let months: Vec<MonthlyRevenue> = by_month
        .into_iter()
        .map(|((year, month), total)| MonthlyRevenue {
            label: month_label(year, month),
            total,
        })
        .collect();

    let skip = months.len().saturating_sub(6);
    months.into_iter().skip(skip).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryQuantity {
    pub category: String,
    pub quantity: i64,
}

/// Quantities produced per item category, largest first.
pub fn category_quantities(orders: &[&OrderWithItems]) -> Vec<CategoryQuantity> {
    let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
    for entry in orders {
        for item in &entry.items {
            *by_category.entry(item.category.clone()).or_insert(0) += i64::from(item.quantity);
        }
    }

    let mut totals: Vec<CategoryQuantity> = by_category
        .into_iter()
        .map(|(category, quantity)| CategoryQuantity { category, quantity })
        .collect();
    totals.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    totals
}

/// Deadline pressure indicator for a listing row. `None` when there is
/// no estimate or the order already left production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleStatus {
    Overdue { days: i64 },
    DueToday,
    DueSoon { days: i64 },
    OnTrack,
}

pub fn schedule_status(
    estimated_date: Option<NaiveDate>,
    status: OrderStatus,
    today: NaiveDate,
) -> Option<ScheduleStatus> {
    let target = estimated_date?;
    if status.is_terminal() {
        return None;
    }

    let days = (target - today).num_days();
    Some(if days < 0 {
        ScheduleStatus::Overdue { days: -days }
    } else if days == 0 {
        ScheduleStatus::DueToday
    } else if days <= 3 {
        ScheduleStatus::DueSoon { days }
    } else {
        ScheduleStatus::OnTrack
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{order, order_item};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn entry(
        number: &str,
        client: &str,
        status: OrderStatus,
        grand_total: i64,
        dp: i64,
        created: (i32, u32, u32),
        quantities: &[i32],
    ) -> OrderWithItems {
        let id = Uuid::new_v4();
        let (year, month, day) = created;
        OrderWithItems {
            order: order::Model {
                id,
                order_number: number.to_string(),
                client_name: client.to_string(),
                client_phone: None,
                current_status: status.to_string(),
                estimated_date: None,
                grand_total,
                dp_amount: dp,
                remaining_balance: grand_total - dp,
                created_by: None,
                created_at: Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap(),
            },
            items: quantities
                .iter()
                .map(|&q| order_item::Model {
                    id: Uuid::new_v4(),
                    order_id: id,
                    product_name: "Kaos".to_string(),
                    category: "atasan".to_string(),
                    quantity: q,
                    notes: None,
                    price_per_unit: 10_000,
                    total_price: i64::from(q) * 10_000,
                })
                .collect(),
        }
    }

    fn fixture() -> Vec<OrderWithItems> {
        vec![
            entry("INV-202501-0001", "Budi Santoso", OrderStatus::Pending, 100_000, 0, (2025, 1, 5), &[2]),
            entry("INV-202501-0002", "SMA Negeri 1", OrderStatus::Cutting, 500_000, 250_000, (2025, 1, 20), &[10, 5]),
            entry("INV-202502-0003", "Budi Raharjo", OrderStatus::Production, 300_000, 300_000, (2025, 2, 3), &[6]),
            entry("INV-202502-0004", "Koperasi Maju", OrderStatus::Completed, 250_000, 400_000, (2025, 2, 14), &[4]),
            entry("INV-202503-0005", "Bengkel Jaya", OrderStatus::Cancelled, 150_000, 0, (2025, 3, 1), &[3]),
            entry("INV-202503-0006", "SMA Negeri 1", OrderStatus::Packing, 200_000, 100_000, (2025, 3, 9), &[8]),
        ]
    }

    #[test]
    fn search_matches_name_or_number_case_insensitively() {
        let orders = fixture();
        let filter = ListingFilter {
            search: Some("sma negeri".to_string()),
            ..Default::default()
        };
        let hits = filter_orders(&orders, &filter);
        assert_eq!(hits.len(), 2);

        let filter = ListingFilter {
            search: Some("0003".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_orders(&orders, &filter).len(), 1);
    }

    #[test]
    fn filters_compose_as_intersection() {
        let orders = fixture();
        let filter = ListingFilter {
            search: Some("budi".to_string()),
            status: Some(OrderStatus::Production),
            payment: Some(PaymentFilter::Lunas),
        };
        let hits = filter_orders(&orders, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].order.order_number, "INV-202502-0003");

        // Same search without the payment predicate widens the result.
        let filter = ListingFilter {
            search: Some("budi".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_orders(&orders, &filter).len(), 2);
    }

    #[test]
    fn payment_filter_treats_overpayment_as_settled() {
        let orders = fixture();
        let filter = ListingFilter {
            payment: Some(PaymentFilter::Lunas),
            ..Default::default()
        };
        let hits = filter_orders(&orders, &filter);
        let numbers: Vec<&str> = hits.iter().map(|o| o.order.order_number.as_str()).collect();
        assert!(numbers.contains(&"INV-202502-0003"));
        assert!(numbers.contains(&"INV-202502-0004"));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn wildcard_filter_returns_everything() {
        let orders = fixture();
        assert_eq!(filter_orders(&orders, &ListingFilter::default()).len(), 6);
    }

    #[test]
    fn period_filter_by_month_and_year() {
        let orders = fixture();
        let january = filter_by_period(&orders, Period { month: Some(1), year: Some(2025) });
        assert_eq!(january.len(), 2);

        let whole_year = filter_by_period(&orders, Period { month: None, year: Some(2025) });
        assert_eq!(whole_year.len(), 6);

        let nothing = filter_by_period(&orders, Period { month: Some(7), year: Some(2024) });
        assert!(nothing.is_empty());
    }

    #[test]
    fn production_stats_sums_the_working_set() {
        let orders = fixture();
        let all: Vec<&OrderWithItems> = orders.iter().collect();
        let stats = production_stats(&all);

        assert_eq!(stats.total_revenue, 1_500_000);
        assert_eq!(stats.total_deposits, 1_050_000);
        assert_eq!(stats.total_receivables, 450_000);
        assert_eq!(stats.total_items, 38);
        assert_eq!(stats.active_production_count, 3);
        assert_eq!(stats.status_counts.get("pending"), Some(&1));
        assert_eq!(stats.status_counts.get("cutting"), Some(&1));
        assert_eq!(stats.status_counts.get("cancelled"), Some(&1));
    }

    #[test]
    fn monthly_trend_keeps_six_most_recent_months_in_order() {
        let mut orders = Vec::new();
        for month in 1..=8u32 {
            orders.push(entry(
                &format!("INV-2025{month:02}-0001"),
                "Budi",
                OrderStatus::Confirmed,
                i64::from(month) * 10_000,
                0,
                (2025, month, 2),
                &[1],
            ));
        }
        let refs: Vec<&OrderWithItems> = orders.iter().collect();
        let trend = monthly_revenue_trend(&refs);

        assert_eq!(trend.len(), 6);
        assert_eq!(trend.first().unwrap().label, "Mar 25");
        assert_eq!(trend.last().unwrap().label, "Agu 25");
        assert_eq!(trend.last().unwrap().total, 80_000);
    }

    #[test]
    fn category_quantities_sort_largest_first() {
        let mut orders = fixture();
        orders[0].items[0].category = "setelan".to_string();
        let refs: Vec<&OrderWithItems> = orders.iter().collect();
        let totals = category_quantities(&refs);

        assert_eq!(totals[0].category, "atasan");
        assert_eq!(totals[0].quantity, 36);
        assert_eq!(totals[1].category, "setelan");
        assert_eq!(totals[1].quantity, 2);
    }

    #[test]
    fn schedule_status_buckets() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let date = |d: u32| NaiveDate::from_ymd_opt(2025, 3, d);

        assert_eq!(
            schedule_status(date(5), OrderStatus::Production, today),
            Some(ScheduleStatus::Overdue { days: 5 })
        );
        assert_eq!(
            schedule_status(date(10), OrderStatus::Production, today),
            Some(ScheduleStatus::DueToday)
        );
        assert_eq!(
            schedule_status(date(12), OrderStatus::Production, today),
            Some(ScheduleStatus::DueSoon { days: 2 })
        );
        assert_eq!(
            schedule_status(date(25), OrderStatus::Production, today),
            Some(ScheduleStatus::OnTrack)
        );
        // Finished or cancelled orders carry no deadline pressure.
        assert_eq!(schedule_status(date(5), OrderStatus::Completed, today), None);
        assert_eq!(schedule_status(date(5), OrderStatus::Cancelled, today), None);
        assert_eq!(schedule_status(None, OrderStatus::Production, today), None);
    }
}
