// ABOUTME: Dashboard aggregation of coupon sales, redemptions and revenue by calendar month and service center
// ABOUTME: Loads rows once per request and computes every widget with pure functions over an injected clock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! # Dashboard
//!
//! All figures are bucketed by UTC calendar month. A window of `months` covers the
//! current month and the `months - 1` before it, oldest first, each labelled like
//! `"Jan 2025"`.
//!
//! "Coupons sold" in monthly figures counts invoices created in the month, and
//! revenue only counts invoices whose payment status is Paid. Soft-deleted invoices
//! never reach these functions.

use chrono::{DateTime, Datelike, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::constants::dashboard::MAX_MONTHS;
use crate::database::Database;
use crate::errors::AppResult;
use crate::models::{
    Coupon, CouponStatus, Invoice, PaymentStatus, ServiceCenter, ServiceRedemption,
};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    /// Calendar year
    pub year: i32,
    /// Month number, 1 to 12
    pub month: u32,
}

impl MonthKey {
    /// Month containing the instant
    #[must_use]
    pub fn of(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// The month `n` months before this one
    #[must_use]
    pub fn months_before(self, n: u32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month - 1) - i64::from(n);
        Self {
            year: i32::try_from(index.div_euclid(12)).unwrap_or(self.year),
            month: u32::try_from(index.rem_euclid(12)).unwrap_or(0) + 1,
        }
    }

    /// Display label such as `"Mar 2025"`
    #[must_use]
    pub fn label(self) -> String {
        let name = MONTH_ABBREVIATIONS
            .get((self.month as usize).saturating_sub(1))
            .copied()
            .unwrap_or("???");
        format!("{name} {}", self.year)
    }

    /// Whether the instant falls in this month
    #[must_use]
    pub fn contains(self, dt: DateTime<Utc>) -> bool {
        Self::of(dt) == self
    }
}

/// Clamp a requested window to `1..=36` months, using `default` when absent
#[must_use]
pub fn clamp_months(requested: Option<i64>, default: u32) -> u32 {
    requested.map_or(default, |m| {
        u32::try_from(m.clamp(1, i64::from(MAX_MONTHS))).unwrap_or(default)
    })
}

/// The months of a window ending at `now`, oldest first
#[must_use]
pub fn month_window(now: DateTime<Utc>, months: u32) -> Vec<MonthKey> {
    let current = MonthKey::of(now);
    (0..months.max(1))
        .rev()
        .map(|back| current.months_before(back))
        .collect()
}

/// Rows the dashboard aggregates over, already limited to one service center when
/// the caller is scoped to one
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    /// Coupons sold by the center (or all coupons)
    pub coupons: Vec<Coupon>,
    /// Non-deleted invoices of the center (or all)
    pub invoices: Vec<Invoice>,
    /// Redemptions fulfilled by the center (or all)
    pub redemptions: Vec<ServiceRedemption>,
    /// The center itself (or every center)
    pub service_centers: Vec<ServiceCenter>,
}

impl DashboardSnapshot {
    /// Load the rows visible for a service center scope
    ///
    /// # Errors
    ///
    /// Returns an error if any query fails
    pub async fn load(database: &Database, service_center_id: Option<i64>) -> AppResult<Self> {
        let coupons = database
            .coupons()
            .list_for_service_center(service_center_id)
            .await?;

        let (invoices, redemptions, service_centers) = match service_center_id {
            Some(id) => (
                database.invoices().list_by_service_center(id).await?,
                database.redemptions().list_by_service_center(id).await?,
                database
                    .service_centers()
                    .get_by_id(id)
                    .await?
                    .into_iter()
                    .collect(),
            ),
            None => (
                database.invoices().list_all().await?,
                database.redemptions().list_all().await?,
                database.service_centers().list().await?,
            ),
        };

        Ok(Self {
            coupons,
            invoices,
            redemptions,
            service_centers,
        })
    }
}

/// Headline figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Coupons that have left the Unassigned state
    pub total_coupons_sold: usize,
    /// Invoices created last month
    pub coupons_sold_last_month: usize,
    /// Invoices created this month
    pub coupons_sold_this_month: usize,
    /// Coupons currently Active
    pub active_coupons: usize,
    /// Redemptions ever recorded
    pub services_completed: usize,
    /// Redemptions recorded this month
    pub services_completed_this_month: usize,
    /// Paid invoice total
    pub total_revenue: Decimal,
    /// Paid invoice total for invoices created this month
    pub revenue_this_month: Decimal,
    /// Paid invoice total for invoices created last month
    pub revenue_last_month: Decimal,
}

/// Revenue and sales for one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesTrend {
    /// Month label
    pub month: String,
    /// Calendar year
    pub year: i32,
    /// Paid invoice total
    pub revenue: Decimal,
    /// Invoices created
    pub coupons_sold: usize,
}

/// Activity of one service center over a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCenterStats {
    /// Center id, 0 for an all-center aggregate
    pub service_center_id: i64,
    /// Center name, or a month label in the distribution widget
    pub service_center_name: String,
    /// Redemptions fulfilled
    pub services_completed: usize,
    /// Redemptions fulfilled
    pub coupons_redeemed: usize,
    /// Paid invoice total
    pub revenue: Decimal,
}

/// Activity of one service center in one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCenterMonthlyStats {
    /// Center id
    pub service_center_id: i64,
    /// Center name
    pub service_center_name: String,
    /// Month label
    pub month: String,
    /// Calendar year
    pub year: i32,
    /// Redemptions fulfilled
    pub services_completed: usize,
    /// Redemptions fulfilled
    pub coupons_redeemed: usize,
    /// Paid invoice total
    pub revenue: Decimal,
}

/// Activity across every center in one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAggregate {
    /// Month label
    pub month: String,
    /// Redemptions fulfilled
    pub services_completed: usize,
    /// Redemptions fulfilled
    pub coupons_redeemed: usize,
    /// Paid invoice total
    pub revenue: Decimal,
}

/// Coupon purchases and redemptions in one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponUsage {
    /// Month label
    pub period: String,
    /// Coupons purchased in the month
    pub total_coupons: usize,
    /// Redemptions recorded in the month
    pub redeemed_coupons: usize,
    /// Redemptions per purchased coupon, as a percentage with two decimals
    pub redemption_rate: Decimal,
    /// Purchased coupons that are Active now
    pub active_coupons: usize,
    /// Purchased coupons that are Expired now
    pub expired_coupons: usize,
}

/// Coupon usage with the full status breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponUsageMonthly {
    /// Month label
    pub period: String,
    /// Calendar year
    pub year: i32,
    /// Coupons purchased in the month
    pub total_coupons: usize,
    /// Redemptions recorded in the month
    pub redeemed_coupons: usize,
    /// Redemptions per purchased coupon, as a percentage with two decimals
    pub redemption_rate: Decimal,
    /// Purchased coupons that are Active now
    pub active_coupons: usize,
    /// Purchased coupons that are Expired now
    pub expired_coupons: usize,
    /// Purchased coupons that are Unassigned now
    pub unassigned_coupons: usize,
    /// Purchased coupons that are Completed now
    pub completed_coupons: usize,
}

/// A titled chart payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget<T> {
    /// Chart title
    pub title: String,
    /// One-line description
    pub description: String,
    /// Footer caption
    pub footer: String,
    /// Series points
    pub data: Vec<T>,
}

/// The three dashboard charts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardWidgets {
    /// Monthly revenue and sales
    pub sales_trends: Widget<SalesTrend>,
    /// Monthly services, labelled by month
    pub service_center_distribution: Widget<ServiceCenterStats>,
    /// Monthly coupon usage
    pub coupon_usage: Widget<CouponUsageMonthly>,
}

fn is_paid(invoice: &Invoice) -> bool {
    invoice.payment_status == PaymentStatus::Paid
}

/// Round to two decimal places and always carry two, so `150` serializes as `"150.00"`
fn two_places(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

fn paid_total<'a>(invoices: impl Iterator<Item = &'a Invoice>) -> Decimal {
    two_places(invoices.filter(|i| is_paid(i)).map(|i| i.total_amount).sum())
}

fn redemption_rate(redeemed: usize, total: usize) -> Decimal {
    if total == 0 {
        return two_places(Decimal::ZERO);
    }
    two_places(Decimal::from(redeemed) * Decimal::ONE_HUNDRED / Decimal::from(total))
}

/// Headline figures at `now`
#[must_use]
pub fn stats(snapshot: &DashboardSnapshot, now: DateTime<Utc>) -> DashboardStats {
    let this_month = MonthKey::of(now);
    let last_month = this_month.months_before(1);

    let invoices_in = |month: MonthKey| {
        snapshot
            .invoices
            .iter()
            .filter(move |i| month.contains(i.created_at))
    };

    DashboardStats {
        total_coupons_sold: snapshot
            .coupons
            .iter()
            .filter(|c| c.status != CouponStatus::Unassigned)
            .count(),
        coupons_sold_last_month: invoices_in(last_month).count(),
        coupons_sold_this_month: invoices_in(this_month).count(),
        active_coupons: snapshot
            .coupons
            .iter()
            .filter(|c| c.status == CouponStatus::Active)
            .count(),
        services_completed: snapshot.redemptions.len(),
        services_completed_this_month: snapshot
            .redemptions
            .iter()
            .filter(|r| this_month.contains(r.redemption_date))
            .count(),
        total_revenue: paid_total(snapshot.invoices.iter()),
        revenue_this_month: paid_total(invoices_in(this_month)),
        revenue_last_month: paid_total(invoices_in(last_month)),
    }
}

/// Monthly revenue and invoice counts
#[must_use]
pub fn sales_trends(snapshot: &DashboardSnapshot, months: u32, now: DateTime<Utc>) -> Vec<SalesTrend> {
    month_window(now, months)
        .into_iter()
        .map(|month| {
            let in_month: Vec<&Invoice> = snapshot
                .invoices
                .iter()
                .filter(|i| month.contains(i.created_at))
                .collect();
            SalesTrend {
                month: month.label(),
                year: month.year,
                revenue: paid_total(in_month.iter().copied()),
                coupons_sold: in_month.len(),
            }
        })
        .collect()
}

/// Per-center activity since `months` months before `now`, busiest first
#[must_use]
pub fn service_center_stats(
    snapshot: &DashboardSnapshot,
    months: u32,
    now: DateTime<Utc>,
) -> Vec<ServiceCenterStats> {
    let cutoff = now.checked_sub_months(Months::new(months)).unwrap_or(now);

    let mut stats: Vec<ServiceCenterStats> = snapshot
        .service_centers
        .iter()
        .map(|center| {
            let redeemed = snapshot
                .redemptions
                .iter()
                .filter(|r| r.service_center_id == center.id && r.redemption_date >= cutoff)
                .count();
            ServiceCenterStats {
                service_center_id: center.id,
                service_center_name: center.name.clone(),
                services_completed: redeemed,
                coupons_redeemed: redeemed,
                revenue: paid_total(
                    snapshot
                        .invoices
                        .iter()
                        .filter(|i| i.service_center_id == center.id && i.created_at >= cutoff),
                ),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.services_completed.cmp(&a.services_completed));
    stats
}

/// Per-center, per-month activity ordered by center name then month
#[must_use]
pub fn service_center_monthly_stats(
    snapshot: &DashboardSnapshot,
    months: u32,
    now: DateTime<Utc>,
) -> Vec<ServiceCenterMonthlyStats> {
    let window = month_window(now, months);
    let mut centers: Vec<&ServiceCenter> = snapshot.service_centers.iter().collect();
    centers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    centers
        .into_iter()
        .flat_map(|center| {
            window.iter().map(move |&month| {
                let redeemed = snapshot
                    .redemptions
                    .iter()
                    .filter(|r| r.service_center_id == center.id && month.contains(r.redemption_date))
                    .count();
                ServiceCenterMonthlyStats {
                    service_center_id: center.id,
                    service_center_name: center.name.clone(),
                    month: month.label(),
                    year: month.year,
                    services_completed: redeemed,
                    coupons_redeemed: redeemed,
                    revenue: paid_total(snapshot.invoices.iter().filter(|i| {
                        i.service_center_id == center.id && month.contains(i.created_at)
                    })),
                }
            })
        })
        .collect()
}

/// Monthly activity summed over every row in the snapshot
#[must_use]
pub fn monthly_aggregated(
    snapshot: &DashboardSnapshot,
    months: u32,
    now: DateTime<Utc>,
) -> Vec<MonthlyAggregate> {
    month_window(now, months)
        .into_iter()
        .map(|month| {
            let redeemed = snapshot
                .redemptions
                .iter()
                .filter(|r| month.contains(r.redemption_date))
                .count();
            MonthlyAggregate {
                month: month.label(),
                services_completed: redeemed,
                coupons_redeemed: redeemed,
                revenue: paid_total(
                    snapshot
                        .invoices
                        .iter()
                        .filter(|i| month.contains(i.created_at)),
                ),
            }
        })
        .collect()
}

/// Monthly coupon usage with the full status breakdown, oldest first
#[must_use]
pub fn coupon_usage_monthly(
    snapshot: &DashboardSnapshot,
    months: u32,
    now: DateTime<Utc>,
) -> Vec<CouponUsageMonthly> {
    month_window(now, months)
        .into_iter()
        .map(|month| {
            let purchased: Vec<&Coupon> = snapshot
                .coupons
                .iter()
                .filter(|c| month.contains(c.purchase_date))
                .collect();
            let with_status =
                |status: CouponStatus| purchased.iter().filter(|c| c.status == status).count();
            let redeemed = snapshot
                .redemptions
                .iter()
                .filter(|r| month.contains(r.redemption_date))
                .count();

            CouponUsageMonthly {
                period: month.label(),
                year: month.year,
                total_coupons: purchased.len(),
                redeemed_coupons: redeemed,
                redemption_rate: redemption_rate(redeemed, purchased.len()),
                active_coupons: with_status(CouponStatus::Active),
                expired_coupons: with_status(CouponStatus::Expired),
                unassigned_coupons: with_status(CouponStatus::Unassigned),
                completed_coupons: with_status(CouponStatus::Completed),
            }
        })
        .collect()
}

/// Monthly coupon usage, oldest first
#[must_use]
pub fn coupon_usage(snapshot: &DashboardSnapshot, months: u32, now: DateTime<Utc>) -> Vec<CouponUsage> {
    coupon_usage_monthly(snapshot, months, now)
        .into_iter()
        .map(|m| CouponUsage {
            period: m.period,
            total_coupons: m.total_coupons,
            redeemed_coupons: m.redeemed_coupons,
            redemption_rate: m.redemption_rate,
            active_coupons: m.active_coupons,
            expired_coupons: m.expired_coupons,
        })
        .collect()
}

/// The three dashboard charts
///
/// For a single center the distribution chart shows that center month by month;
/// across all centers it shows the monthly aggregate with center id 0.
#[must_use]
pub fn widgets(
    snapshot: &DashboardSnapshot,
    service_center_id: Option<i64>,
    months: u32,
    now: DateTime<Utc>,
) -> DashboardWidgets {
    let distribution = if service_center_id.is_some() {
        service_center_monthly_stats(snapshot, months, now)
            .into_iter()
            .map(|m| ServiceCenterStats {
                service_center_id: m.service_center_id,
                service_center_name: m.month,
                services_completed: m.services_completed,
                coupons_redeemed: m.coupons_redeemed,
                revenue: m.revenue,
            })
            .collect()
    } else {
        monthly_aggregated(snapshot, months, now)
            .into_iter()
            .map(|m| ServiceCenterStats {
                service_center_id: 0,
                service_center_name: m.month,
                services_completed: m.services_completed,
                coupons_redeemed: m.coupons_redeemed,
                revenue: m.revenue,
            })
            .collect()
    };

    DashboardWidgets {
        sales_trends: Widget {
            title: "Sales Trends".to_owned(),
            description: "Monthly sales performance over time".to_owned(),
            footer: format!("Last {months} months"),
            data: sales_trends(snapshot, months, now),
        },
        service_center_distribution: Widget {
            title: "Services by Service Center".to_owned(),
            description: "Distribution of services across centers".to_owned(),
            footer: "By location".to_owned(),
            data: distribution,
        },
        coupon_usage: Widget {
            title: "Coupon Usage".to_owned(),
            description: "Usage patterns and redemption rates".to_owned(),
            footer: "Redemption rate".to_owned(),
            data: coupon_usage_monthly(snapshot, months, now),
        },
    }
}
