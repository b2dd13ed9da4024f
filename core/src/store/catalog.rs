use super::{from_bool, to_bool, FinanceStore};
use crate::{
    error::{FinanceError, FinanceResult},
    matcher::same_rate,
    model::{
        CalculationType, CampaignCode, ConfigurationDetail, FinancialCampaign, FinancialEntity,
        InterestRate, LoanTerm,
    },
    types::EntityId,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// One line of an uploaded rate sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateSheetRow {
    pub entity_id:        EntityId,
    pub campaign:         String,
    pub rate:             f64,
    pub term_months:      u32,
    pub calculation_type: CalculationType,
    pub value:            f64,
    #[serde(default)]
    pub min_vehicle_age_months: Option<u32>,
    #[serde(default)]
    pub max_vehicle_age_months: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateSheetSummary {
    pub inserted:         usize,
    pub updated:          usize,
    /// Rows naming an entity that is not seeded.
    pub skipped_entity:   usize,
    /// Rows naming a campaign other than `vn`/`vo`.
    pub skipped_campaign: usize,
    /// Rows with a negative or non-finite rate or value, or a zero term.
    #[serde(default)]
    pub skipped_invalid:  usize,
}

const DETAIL_SELECT: &str =
    "SELECT d.id, d.configuration_id, e.id, e.name, c.code, r.value, t.duration_months,
            d.calculation_type, d.value, d.min_vehicle_age_months, d.max_vehicle_age_months,
            d.is_active
     FROM financial_configuration_detail d
     JOIN financial_entity_configuration fc ON fc.id = d.configuration_id
     JOIN financial_entity e                ON e.id  = fc.entity_id
     JOIN financial_campaign c              ON c.id  = d.campaign_id
     JOIN financial_interest_rate r         ON r.id  = d.interest_rate_id
     JOIN financial_loan_term t             ON t.id  = d.loan_term_id
     WHERE d.is_active = 1 AND fc.is_active = 1 AND e.is_active = 1";

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<Option<ConfigurationDetail>> {
    let campaign: String = row.get(4)?;
    let kind: String = row.get(7)?;
    let (Some(campaign), Some(calculation_type)) =
        (CampaignCode::parse(&campaign), CalculationType::parse(&kind))
    else {
        return Ok(None);
    };
    Ok(Some(ConfigurationDetail {
        id:                     row.get(0)?,
        configuration_id:       row.get(1)?,
        entity_id:              row.get(2)?,
        entity_name:            row.get(3)?,
        campaign,
        rate:                   row.get(5)?,
        term_months:            row.get::<_, i64>(6)? as u32,
        calculation_type,
        value:                  row.get(8)?,
        min_vehicle_age_months: row.get::<_, Option<i64>>(9)?.map(|v| v as u32),
        max_vehicle_age_months: row.get::<_, Option<i64>>(10)?.map(|v| v as u32),
        is_active:              to_bool(row.get(11)?),
    }))
}

impl FinanceStore {
    // ── Entities ───────────────────────────────────────────────

    /// Entities are seeded once; rate sheets never create them.
    pub fn seed_entity(&self, id: EntityId, name: &str, is_active: bool) -> FinanceResult<()> {
        self.conn.execute(
            "INSERT INTO financial_entity (id, name, is_active) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, is_active = excluded.is_active",
            params![id, name, from_bool(is_active)],
        )?;
        Ok(())
    }

    pub fn set_entity_active(&self, id: EntityId, is_active: bool) -> FinanceResult<()> {
        let changed = self.conn.execute(
            "UPDATE financial_entity SET is_active = ?1 WHERE id = ?2",
            params![from_bool(is_active), id],
        )?;
        if changed == 0 {
            return Err(FinanceError::UnknownEntity { id });
        }
        Ok(())
    }

    pub fn active_entities(&self) -> FinanceResult<Vec<FinancialEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, is_active FROM financial_entity
             WHERE is_active = 1 ORDER BY id ASC",
        )?;
        let entities = stmt
            .query_map([], |row| {
                Ok(FinancialEntity {
                    id:        row.get(0)?,
                    name:      row.get(1)?,
                    is_active: to_bool(row.get(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    // ── Campaigns ──────────────────────────────────────────────

    /// Upsert the two fixed campaigns. `vo` starts one month after the
    /// `vn` threshold.
    pub fn seed_campaigns(&self, new_vehicle_max_age_months: u32) -> FinanceResult<()> {
        upsert_campaign(&self.conn, CampaignCode::Vn, None)?;
        let vo_min = new_vehicle_max_age_months.saturating_add(1);
        upsert_campaign(&self.conn, CampaignCode::Vo, Some(vo_min))?;
        Ok(())
    }

    pub fn campaigns(&self) -> FinanceResult<Vec<FinancialCampaign>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, min_vehicle_age_months FROM financial_campaign ORDER BY code ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, code, min)| {
                CampaignCode::parse(&code).map(|code| FinancialCampaign {
                    id,
                    code,
                    min_vehicle_age_months: min.map(|m| m as u32),
                })
            })
            .collect())
    }

    pub fn interest_rates(&self) -> FinanceResult<Vec<InterestRate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, value FROM financial_interest_rate ORDER BY value ASC")?;
        let rates = stmt
            .query_map([], |row| Ok(InterestRate { id: row.get(0)?, value: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rates)
    }

    pub fn loan_terms(&self) -> FinanceResult<Vec<LoanTerm>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, duration_months FROM financial_loan_term ORDER BY duration_months ASC",
        )?;
        let terms = stmt
            .query_map([], |row| {
                Ok(LoanTerm {
                    id:              row.get(0)?,
                    duration_months: row.get::<_, i64>(1)? as u32,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(terms)
    }

    // ── Rate sheets ────────────────────────────────────────────

    /// Load rate-sheet rows in one transaction.
    ///
    /// Strict mode: rows for unknown entities are skipped, never created.
    /// Existing (configuration, campaign, rate, term, type) rows get their
    /// value and age bounds updated instead of a duplicate insert.
    pub fn load_rate_sheet(&self, rows: &[RateSheetRow]) -> FinanceResult<RateSheetSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = RateSheetSummary::default();

        for row in rows {
            if let Some(reason) = invalid_row_reason(row) {
                log::warn!(
                    "catalog: skipping row for entity {} at {}%/{}m: {reason}",
                    row.entity_id, row.rate, row.term_months
                );
                summary.skipped_invalid += 1;
                continue;
            }
            let Some(campaign) = CampaignCode::parse(&row.campaign) else {
                log::warn!("catalog: skipping row with campaign {:?}", row.campaign);
                summary.skipped_campaign += 1;
                continue;
            };
            if !entity_exists(&tx, row.entity_id)? {
                log::warn!("catalog: skipping row for unknown entity {}", row.entity_id);
                summary.skipped_entity += 1;
                continue;
            }

            let campaign_id = upsert_campaign(&tx, campaign, None)?;
            let rate_id = get_or_create_rate(&tx, row.rate)?;
            let term_id = get_or_create_term(&tx, row.term_months)?;
            let configuration_id = get_or_create_configuration(&tx, row.entity_id)?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM financial_configuration_detail
                     WHERE configuration_id = ?1 AND campaign_id = ?2
                       AND interest_rate_id = ?3 AND loan_term_id = ?4
                       AND calculation_type = ?5 AND is_active = 1
                     ORDER BY id ASC LIMIT 1",
                    params![configuration_id, campaign_id, rate_id, term_id, row.calculation_type.as_str()],
                    |r| r.get(0),
                )
                .optional()?;

            let min_age = row.min_vehicle_age_months.map(|v| v as i64);
            let max_age = row.max_vehicle_age_months.map(|v| v as i64);
            match existing {
                Some(detail_id) => {
                    tx.execute(
                        "UPDATE financial_configuration_detail
                         SET value = ?1, min_vehicle_age_months = ?2, max_vehicle_age_months = ?3
                         WHERE id = ?4",
                        params![row.value, min_age, max_age, detail_id],
                    )?;
                    summary.updated += 1;
                }
                None => {
                    tx.execute(
                        "INSERT INTO financial_configuration_detail (
                            configuration_id, campaign_id, interest_rate_id, loan_term_id,
                            calculation_type, value, min_vehicle_age_months, max_vehicle_age_months,
                            is_active
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)",
                        params![
                            configuration_id,
                            campaign_id,
                            rate_id,
                            term_id,
                            row.calculation_type.as_str(),
                            row.value,
                            min_age,
                            max_age,
                        ],
                    )?;
                    summary.inserted += 1;
                }
            }
        }

        tx.commit()?;
        log::info!(
            "catalog: rate sheet loaded ({} inserted, {} updated, {} unknown entity, {} bad campaign, {} invalid)",
            summary.inserted, summary.updated, summary.skipped_entity, summary.skipped_campaign,
            summary.skipped_invalid
        );
        Ok(summary)
    }

    // ── Matching reads ─────────────────────────────────────────

    /// Active detail rows for active entities at one campaign and term,
    /// restricted to the requested rates.
    pub fn matching_details(
        &self,
        campaign: CampaignCode,
        term_months: u32,
        rates: &[f64],
    ) -> FinanceResult<Vec<ConfigurationDetail>> {
        let sql = format!("{DETAIL_SELECT} AND c.code = ?1 AND t.duration_months = ?2 ORDER BY d.id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![campaign.as_str(), term_months as i64], detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .flatten()
            .filter(|d| rates.iter().any(|r| same_rate(*r, d.rate)))
            .collect())
    }

    /// Every active detail row for a campaign, across all rates and terms.
    pub fn campaign_details(&self, campaign: CampaignCode) -> FinanceResult<Vec<ConfigurationDetail>> {
        let sql = format!("{DETAIL_SELECT} AND c.code = ?1 ORDER BY d.id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![campaign.as_str()], detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().flatten().collect())
    }

    // ── Test helpers: catalog ──────────────────────────────────

    pub fn active_detail_count(&self) -> FinanceResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM financial_configuration_detail WHERE is_active = 1",
                [],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

fn invalid_row_reason(row: &RateSheetRow) -> Option<&'static str> {
    if !row.rate.is_finite() || row.rate < 0.0 {
        return Some("rate must be a non-negative number");
    }
    if !row.value.is_finite() || row.value < 0.0 {
        return Some("value must be a non-negative number");
    }
    if row.term_months == 0 {
        return Some("term must be at least one month");
    }
    None
}

fn entity_exists(conn: &Connection, id: EntityId) -> FinanceResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM financial_entity WHERE id = ?1", params![id], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn upsert_campaign(
    conn: &Connection,
    code: CampaignCode,
    min_vehicle_age_months: Option<u32>,
) -> FinanceResult<i64> {
    conn.execute(
        "INSERT INTO financial_campaign (code, min_vehicle_age_months) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET
            min_vehicle_age_months = COALESCE(excluded.min_vehicle_age_months, min_vehicle_age_months)",
        params![code.as_str(), min_vehicle_age_months.map(|m| m as i64)],
    )?;
    conn.query_row(
        "SELECT id FROM financial_campaign WHERE code = ?1",
        params![code.as_str()],
        |r| r.get(0),
    )
    .map_err(Into::into)
}

fn get_or_create_rate(conn: &Connection, value: f64) -> FinanceResult<i64> {
    let mut stmt = conn.prepare("SELECT id, value FROM financial_interest_rate ORDER BY id ASC")?;
    let rates = stmt
        .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, f64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    if let Some((id, _)) = rates.into_iter().find(|(_, v)| same_rate(*v, value)) {
        return Ok(id);
    }
    conn.execute("INSERT INTO financial_interest_rate (value) VALUES (?1)", params![value])?;
    Ok(conn.last_insert_rowid())
}

fn get_or_create_term(conn: &Connection, duration_months: u32) -> FinanceResult<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO financial_loan_term (duration_months) VALUES (?1)",
        params![duration_months as i64],
    )?;
    conn.query_row(
        "SELECT id FROM financial_loan_term WHERE duration_months = ?1",
        params![duration_months as i64],
        |r| r.get(0),
    )
    .map_err(Into::into)
}

fn get_or_create_configuration(conn: &Connection, entity_id: EntityId) -> FinanceResult<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM financial_entity_configuration
             WHERE entity_id = ?1 AND is_active = 1 ORDER BY id ASC LIMIT 1",
            params![entity_id],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO financial_entity_configuration (entity_id, is_active) VALUES (?1, 1)",
        params![entity_id],
    )?;
    Ok(conn.last_insert_rowid())
}
