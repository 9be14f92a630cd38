//! Receipt selection and price resolution for a payment run.
//!
//! Rows that cannot be read are kept as failures of the receipt, grower or
//! price table they belong to, so one bad row only fails its own grower.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*, sea_query::Query};
use tracing::{debug, warn};

use crate::{
    AdvancePriceSource, AdvanceRound, AllocationStatus, EngineError, Grower, PaymentRunCmd,
    PaymentType, PriceTable, Receipt, ReceiptAmounts, ReceiptLine, ResultEngine, RoundPrices,
    allocations, growers, price_table_entries, price_tables, receipts, round_advance_price,
    util::parse_decimal,
};

/// Growers looked up per query.
const GROWER_CHUNK: usize = 500;

/// A receipt the run may pay, with the unit price its first advance paid.
#[derive(Clone, Debug)]
pub(super) struct EligibleReceipt {
    pub receipt: Receipt,
    pub paid_first: Decimal,
}

/// A receipt selected for the run. `eligible` holds the reason when the
/// receipt or its allocations could not be read.
#[derive(Clone, Debug)]
pub(super) struct Candidate {
    pub grower_id: i64,
    pub receipt_id: i64,
    pub eligible: Result<EligibleReceipt, String>,
}

fn crop_year_bounds(crop_year: i32, cutoff: NaiveDate) -> ResultEngine<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(crop_year, 1, 1)
        .ok_or_else(|| EngineError::Validation(format!("invalid crop year {crop_year}")))?;
    let end = NaiveDate::from_ymd_opt(crop_year, 12, 31)
        .ok_or_else(|| EngineError::Validation(format!("invalid crop year {crop_year}")))?;
    Ok((start, end.min(cutoff)))
}

/// Rounds paid per receipt, from active allocations. A price that does not
/// parse is kept as an error so only the receipt it belongs to fails.
#[derive(Debug, Default)]
struct PaidRounds {
    prices: HashMap<PaymentType, Result<Decimal, String>>,
    unreadable: Option<String>,
}

/// Receipts payable in `round`, ordered by grower, date and id.
///
/// A receipt qualifies when it is live, weighs something, falls in the crop
/// year on or before the cutoff, passes the exclusion filters, has no active
/// allocation for `round` yet and has one for every earlier round.
pub(super) async fn eligible_receipts<C: ConnectionTrait>(
    db: &C,
    cmd: &PaymentRunCmd,
    round: AdvanceRound,
) -> ResultEngine<Vec<Candidate>> {
    let (from, to) = crop_year_bounds(cmd.crop_year, cmd.cutoff_date)?;
    let models: Vec<receipts::Model> = receipts::Entity::find()
        .filter(receipts::Column::IsVoided.eq(false))
        .filter(receipts::Column::DeletedAt.is_null())
        .filter(receipts::Column::ReceiptDate.between(from, to))
        .order_by_asc(receipts::Column::GrowerId)
        .order_by_asc(receipts::Column::ReceiptDate)
        .order_by_asc(receipts::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .filter(|model| {
            !cmd.filters
                .excludes(model.grower_id, model.product_id, model.process_id)
        })
        .collect();
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let window = Query::select()
        .column(receipts::Column::Id)
        .from(receipts::Entity)
        .and_where(receipts::Column::IsVoided.eq(false))
        .and_where(receipts::Column::DeletedAt.is_null())
        .and_where(receipts::Column::ReceiptDate.between(from, to))
        .to_owned();
    let mut paid: HashMap<i64, PaidRounds> = HashMap::new();
    for model in allocations::Entity::find()
        .filter(allocations::Column::ReceiptId.in_subquery(window))
        .filter(allocations::Column::Status.eq(AllocationStatus::Active.as_str()))
        .all(db)
        .await?
    {
        let rounds = paid.entry(model.receipt_id).or_default();
        match PaymentType::try_from(model.payment_type.as_str()) {
            Ok(payment_type) => {
                let price = parse_decimal(&model.price_per_unit, "price per unit")
                    .map_err(|err| format!("allocation {}: {err}", model.id));
                rounds.prices.insert(payment_type, price);
            }
            Err(err) => {
                rounds.unreadable = Some(format!("allocation {}: {err}", model.id));
            }
        }
    }

    let mut candidates = Vec::new();
    for model in models {
        let grower_id = model.grower_id;
        let receipt_id = model.id;
        let rounds = paid.get(&receipt_id);
        let has = |r: AdvanceRound| rounds.is_some_and(|p| p.prices.contains_key(&r.payment_type()));
        if has(round) || !round.previous().all(has) {
            continue;
        }
        if let Some(reason) = rounds.and_then(|p| p.unreadable.clone()) {
            candidates.push(Candidate {
                grower_id,
                receipt_id,
                eligible: Err(reason),
            });
            continue;
        }
        let receipt = match Receipt::try_from(model) {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(receipt_id, %err, "unreadable receipt");
                candidates.push(Candidate {
                    grower_id,
                    receipt_id,
                    eligible: Err(err.to_string()),
                });
                continue;
            }
        };
        if receipt.net_weight <= Decimal::ZERO || receipt.advance(round).is_some() {
            continue;
        }
        let paid_first = match rounds.and_then(|p| p.prices.get(&PaymentType::Advance1)) {
            Some(Ok(price)) => Ok(*price),
            Some(Err(reason)) => Err(reason.clone()),
            None => Ok(receipt
                .advance(AdvanceRound::First)
                .map_or(Decimal::ZERO, |a| a.price)),
        };
        candidates.push(Candidate {
            grower_id,
            receipt_id,
            eligible: paid_first.map(|paid_first| EligibleReceipt {
                receipt,
                paid_first,
            }),
        });
    }
    Ok(candidates)
}

/// Live growers among `ids`. A grower row that cannot be read maps to the
/// reason.
pub(super) async fn load_growers<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i64>,
) -> ResultEngine<HashMap<i64, Result<Grower, String>>> {
    let ids: Vec<i64> = ids.into_iter().collect();
    let mut growers = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(GROWER_CHUNK) {
        for model in growers::Entity::find()
            .filter(growers::Column::Id.is_in(chunk.iter().copied()))
            .filter(growers::Column::DeletedAt.is_null())
            .all(db)
            .await?
        {
            let id = model.id;
            let grower = Grower::try_from(model).map_err(|err| {
                warn!(grower_id = id, %err, "unreadable grower");
                err.to_string()
            });
            growers.insert(id, grower);
        }
    }
    Ok(growers)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct EntryKey {
    price_table_id: i64,
    currency: String,
    price_level: i32,
    grade: i32,
}

/// A price table row. `table` holds the reason when its terms do not parse;
/// the row still takes part in table selection.
#[derive(Debug)]
struct TableRow {
    id: i64,
    product_id: i64,
    process_id: i64,
    effective_from: NaiveDate,
    table: Result<PriceTable, String>,
}

impl TableRow {
    fn applies_to(&self, product_id: i64, process_id: i64, date: NaiveDate) -> bool {
        self.product_id == product_id && self.process_id == process_id && self.effective_from <= date
    }

    fn table(&self) -> ResultEngine<&PriceTable> {
        self.table
            .as_ref()
            .map_err(|reason| EngineError::Calculation(format!("price table {}: {reason}", self.id)))
    }
}

impl From<price_tables::Model> for TableRow {
    fn from(model: price_tables::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            process_id: model.process_id,
            effective_from: model.effective_from,
            table: PriceTable::try_from(model).map_err(|err| err.to_string()),
        }
    }
}

/// Price tables and entries relevant to one run.
#[derive(Debug, Default)]
pub(super) struct PriceBook {
    tables: Vec<TableRow>,
    entries: HashMap<EntryKey, Result<RoundPrices, String>>,
}

impl PriceBook {
    /// Load every table for the product/process pairs of `receipts`, plus
    /// any table a receipt references directly.
    pub(super) async fn load<C: ConnectionTrait>(
        db: &C,
        receipts: &[&Receipt],
    ) -> ResultEngine<Self> {
        let products: BTreeSet<i64> = receipts.iter().map(|r| r.product_id).collect();
        let referenced: BTreeSet<i64> = receipts.iter().filter_map(|r| r.price_table_id).collect();

        let mut query = price_tables::Entity::find();
        query = if referenced.is_empty() {
            query.filter(price_tables::Column::ProductId.is_in(products))
        } else {
            query.filter(
                price_tables::Column::ProductId
                    .is_in(products)
                    .or(price_tables::Column::Id.is_in(referenced)),
            )
        };
        let tables: Vec<TableRow> = query.all(db).await?.into_iter().map(TableRow::from).collect();

        let mut entries: HashMap<EntryKey, Result<RoundPrices, String>> = HashMap::new();
        for model in price_table_entries::Entity::find()
            .filter(price_table_entries::Column::PriceTableId.is_in(tables.iter().map(|t| t.id)))
            .all(db)
            .await?
        {
            let round = match u8::try_from(model.round).ok().map(AdvanceRound::try_from) {
                Some(Ok(round)) => round,
                _ => {
                    debug!(entry_id = model.id, round = model.round, "ignoring price entry");
                    continue;
                }
            };
            let key = EntryKey {
                price_table_id: model.price_table_id,
                currency: model.currency.trim().to_ascii_uppercase(),
                price_level: model.price_level,
                grade: model.grade,
            };
            let slot = entries.entry(key).or_insert_with(|| Ok(RoundPrices::default()));
            match parse_decimal(&model.price, "advance price") {
                Ok(price) => {
                    if let Ok(prices) = slot {
                        prices.set(round, price);
                    }
                }
                Err(err) => *slot = Err(format!("price entry {}: {err}", model.id)),
            }
        }
        Ok(Self { tables, entries })
    }

    /// The receipt's own table, else the newest table for its product and
    /// process in effect on the receipt date.
    fn table_for(&self, receipt: &Receipt) -> ResultEngine<&PriceTable> {
        if let Some(table_id) = receipt.price_table_id {
            return self
                .tables
                .iter()
                .find(|row| row.id == table_id)
                .ok_or_else(|| EngineError::Calculation(format!("price table {table_id} not found")))?
                .table();
        }
        self.tables
            .iter()
            .filter(|row| row.applies_to(receipt.product_id, receipt.process_id, receipt.receipt_date))
            .max_by_key(|row| (row.effective_from, row.id))
            .ok_or_else(|| {
                EngineError::Calculation(format!(
                    "no price table for product {} process {} on {}",
                    receipt.product_id, receipt.process_id, receipt.receipt_date
                ))
            })?
            .table()
    }

    /// Price `eligible` for `grower` in `round`.
    pub(super) fn price(
        &self,
        eligible: &EligibleReceipt,
        grower: &Grower,
        round: AdvanceRound,
    ) -> ResultEngine<ReceiptLine> {
        let receipt = &eligible.receipt;
        let table = self.table_for(receipt)?;
        let key = EntryKey {
            price_table_id: table.id,
            currency: grower.currency.code().to_string(),
            price_level: grower.price_level,
            grade: receipt.grade,
        };
        let prices = match self.entries.get(&key) {
            Some(Err(reason)) => return Err(EngineError::Calculation(reason.clone())),
            Some(Ok(prices)) if round.up_to().any(|r| prices.advance_price(r).is_some()) => prices,
            _ => {
                return Err(EngineError::Calculation(format!(
                    "price table {} has no round {round} price for {} level {} grade {}",
                    table.id, key.currency, key.price_level, key.grade
                )));
            }
        };

        let price = round_advance_price(prices, round, eligible.paid_first);
        let amounts = ReceiptAmounts::compute(
            receipt.net_weight,
            round,
            price,
            &table.terms,
            receipt.receipt_time,
        )
        .map_err(|err| EngineError::Calculation(err.to_string()))?;
        debug!(
            receipt_id = receipt.id,
            price_table_id = table.id,
            %price,
            net = %amounts.net(),
            "receipt priced"
        );
        Ok(ReceiptLine {
            receipt_id: receipt.id,
            receipt_number: receipt.receipt_number.clone(),
            receipt_date: receipt.receipt_date,
            price_table_id: table.id,
            net_weight: receipt.net_weight,
            amounts,
        })
    }
}
