use std::collections::BTreeMap;

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
    AdvanceRound, CreateBatchCmd, EngineError, GrowerOutcome, GrowerRun, MoneyCents,
    PaymentRunCmd, Receipt, ResultEngine, RunError, RunMode, RunOptions, RunProgress, RunResult,
};

use super::Engine;

mod eligibility;
mod persist;

use eligibility::{Candidate, PriceBook, eligible_receipts, load_growers};

impl Engine {
    /// Price the eligible receipts of a round without writing anything.
    pub async fn test_run(&self, cmd: &PaymentRunCmd) -> ResultEngine<RunResult> {
        self.test_run_with(cmd, RunOptions::default()).await
    }

    pub async fn test_run_with(
        &self,
        cmd: &PaymentRunCmd,
        options: RunOptions,
    ) -> ResultEngine<RunResult> {
        self.run(cmd, RunMode::Test, &options).await
    }

    /// Pay the eligible receipts of a round into a new Draft batch.
    ///
    /// Each grower is committed on its own: a grower that fails is rolled
    /// back and reported while the others stay paid. Returns `Err` only for
    /// an invalid request; everything else is reported on the [`RunResult`].
    pub async fn actual_run(&self, cmd: &PaymentRunCmd) -> ResultEngine<RunResult> {
        self.actual_run_with(cmd, RunOptions::default()).await
    }

    pub async fn actual_run_with(
        &self,
        cmd: &PaymentRunCmd,
        options: RunOptions,
    ) -> ResultEngine<RunResult> {
        self.run(cmd, RunMode::Actual, &options).await
    }

    async fn run(
        &self,
        cmd: &PaymentRunCmd,
        mode: RunMode,
        options: &RunOptions,
    ) -> ResultEngine<RunResult> {
        let round = AdvanceRound::try_from(cmd.round)?;
        if cmd.actor.name.trim().is_empty() {
            return Err(EngineError::Validation("actor must not be empty".to_string()));
        }
        let run_id = Uuid::new_v4();
        let span = info_span!("payment_run", %run_id, round = round.number(), ?mode);
        self.run_round(cmd, round, mode, run_id, options)
            .instrument(span)
            .await
    }

    async fn run_round(
        &self,
        cmd: &PaymentRunCmd,
        round: AdvanceRound,
        mode: RunMode,
        run_id: Uuid,
        options: &RunOptions,
    ) -> ResultEngine<RunResult> {
        let mut result = RunResult::new(run_id, mode, round);

        let eligible = match eligible_receipts(&self.database, cmd, round).await {
            Ok(eligible) => eligible,
            Err(err) => {
                result.record(RunError::critical(format!("loading receipts: {err}")));
                return Ok(result);
            }
        };
        if eligible.is_empty() {
            info!(crop_year = cmd.crop_year, "no eligible receipts");
            return Ok(result);
        }

        let mut by_grower: BTreeMap<i64, Vec<Candidate>> = BTreeMap::new();
        for candidate in eligible {
            by_grower.entry(candidate.grower_id).or_default().push(candidate);
        }
        let loaded = async {
            let growers = load_growers(&self.database, by_grower.keys().copied()).await?;
            let receipts: Vec<&Receipt> = by_grower
                .values()
                .flatten()
                .filter_map(|c| c.eligible.as_ref().ok())
                .map(|e| &e.receipt)
                .collect();
            let prices = PriceBook::load(&self.database, &receipts).await?;
            Ok::<_, EngineError>((growers, prices))
        }
        .await;
        let (growers, prices) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                result.record(RunError::critical(format!("loading run data: {err}")));
                return Ok(result);
            }
        };

        let batch = if mode == RunMode::Actual {
            let create = CreateBatchCmd::new(
                round.payment_type(),
                cmd.crop_year,
                cmd.payment_date,
                cmd.actor.clone(),
            )
            .cutoff_date(cmd.cutoff_date)
            .notes(format!("Payment run {run_id}"));
            match self.create_run_batch(&create, run_id).await {
                Ok(batch) => Some(batch),
                Err(err) => {
                    result.record(RunError::critical(format!("creating batch: {err}")));
                    return Ok(result);
                }
            }
        } else {
            None
        };

        let total = by_grower.len();
        for (index, (grower_id, receipts)) in by_grower.into_iter().enumerate() {
            if options.is_cancelled() {
                result.record(RunError::critical(format!(
                    "run cancelled after {index} of {total} growers"
                )));
                break;
            }

            let grower = match growers.get(&grower_id) {
                Some(Ok(grower)) => grower,
                found => {
                    let message = match found {
                        Some(Err(reason)) => reason.clone(),
                        _ => "grower not found".to_string(),
                    };
                    result.record(RunError::calculation(grower_id, None, message.clone()));
                    options.report(RunProgress {
                        processed: index + 1,
                        total,
                        grower_id,
                        message,
                    });
                    continue;
                }
            };

            if grower.on_hold && !cmd.filters.include_on_hold {
                info!(grower_id, receipts = receipts.len(), "grower on hold, skipped");
                result.growers.push(GrowerRun {
                    grower_id,
                    grower_number: grower.number.clone(),
                    grower_name: grower.name.clone(),
                    outcome: GrowerOutcome::OnHold,
                    lines: Vec::new(),
                    total: MoneyCents::ZERO,
                });
                options.report(RunProgress {
                    processed: index + 1,
                    total,
                    grower_id,
                    message: format!("{} on hold", grower.number),
                });
                continue;
            }

            let mut lines = Vec::with_capacity(receipts.len());
            for candidate in &receipts {
                let priced = match &candidate.eligible {
                    Ok(eligible) => prices.price(eligible, grower, round).map_err(|err| err.to_string()),
                    Err(reason) => Err(reason.clone()),
                };
                match priced {
                    Ok(line) => lines.push(line),
                    Err(message) => result.record(RunError::calculation(
                        grower_id,
                        Some(candidate.receipt_id),
                        message,
                    )),
                }
            }

            let mut outcome = if lines.is_empty() {
                GrowerOutcome::Failed
            } else {
                GrowerOutcome::Paid
            };
            if outcome == GrowerOutcome::Paid
                && let Some(batch) = &batch
                && let Err(err) = self
                    .pay_grower(batch, grower_id, round, &lines, &cmd.actor)
                    .await
            {
                warn!(grower_id, %err, "grower payments rolled back");
                result.record(RunError::persistence(grower_id, err.to_string()));
                outcome = GrowerOutcome::Failed;
            }

            let grower_total = GrowerRun::total_of(&lines);
            if outcome == GrowerOutcome::Paid {
                result.total_amount += grower_total;
                result.receipt_count += lines.len();
            }
            options.report(RunProgress {
                processed: index + 1,
                total,
                grower_id,
                message: format!("{} {} receipt(s)", grower.number, lines.len()),
            });
            result.growers.push(GrowerRun {
                grower_id,
                grower_number: grower.number.clone(),
                grower_name: grower.name.clone(),
                outcome,
                lines,
                total: grower_total,
            });
        }

        if let Some(batch) = batch {
            result.created_batch = match self.update_batch_totals(batch.id).await {
                Ok(updated) => Some(updated),
                Err(err) => {
                    result.record(RunError::critical(format!(
                        "updating totals of batch {}: {err}",
                        batch.batch_number
                    )));
                    Some(batch)
                }
            };
        }

        info!(
            success = result.success,
            errors = result.errors.len(),
            growers = result.paid_growers().count(),
            receipts = result.receipt_count,
            total = %result.total_amount,
            "payment run finished"
        );
        Ok(result)
    }
}
