use super::{from_bool, to_bool, FinanceStore};
use crate::{
    error::{FinanceError, FinanceResult},
    model::{StoredFinancingOption, Vehicle},
    ranker::InventoryOption,
    types::{DealershipId, VehicleId},
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

const VEHICLE_SELECT: &str =
    "SELECT id, dealership_id, registration_date, price,
            min_fee_with_insurance, min_fee_term_with_insurance,
            min_fee_without_insurance, min_fee_term_without_insurance
     FROM vehicle";

fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    let registration: NaiveDate = row.get(2)?;
    Ok(Vehicle {
        id:                             row.get(0)?,
        dealership_id:                  row.get(1)?,
        registration_date:              registration,
        price:                          row.get(3)?,
        min_fee_with_insurance:         row.get(4)?,
        min_fee_term_with_insurance:    row.get::<_, Option<i64>>(5)?.map(|t| t as u32),
        min_fee_without_insurance:      row.get(6)?,
        min_fee_term_without_insurance: row.get::<_, Option<i64>>(7)?.map(|t| t as u32),
    })
}

impl FinanceStore {
    // ── Dealerships and vehicles ───────────────────────────────

    pub fn insert_dealership(&self, id: DealershipId, name: &str) -> FinanceResult<()> {
        self.conn.execute(
            "INSERT INTO dealership (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(())
    }

    pub fn insert_vehicle(
        &self,
        id: VehicleId,
        dealership_id: DealershipId,
        registration_date: NaiveDate,
        price: f64,
    ) -> FinanceResult<()> {
        self.conn.execute(
            "INSERT INTO vehicle (id, dealership_id, registration_date, price)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, dealership_id, registration_date, price],
        )?;
        Ok(())
    }

    pub fn vehicle(&self, id: VehicleId) -> FinanceResult<Vehicle> {
        let sql = format!("{VEHICLE_SELECT} WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], vehicle_from_row)
            .optional()?
            .ok_or(FinanceError::UnknownVehicle { id })
    }

    pub fn dealership_vehicle_ids(&self, dealership_id: DealershipId) -> FinanceResult<Vec<VehicleId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM vehicle WHERE dealership_id = ?1 ORDER BY id ASC",
        )?;
        let ids = stmt
            .query_map(params![dealership_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ── Financing options ──────────────────────────────────────

    /// Replace one vehicle's options for one insurance mode and refresh the
    /// cached minimum installment, all in one transaction. An empty `options`
    /// clears both.
    pub fn replace_financing_options(
        &self,
        vehicle_id: VehicleId,
        with_insurance: bool,
        options: &[InventoryOption],
        batch_id: &str,
        updated_at: NaiveDate,
    ) -> FinanceResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM vehicle_financing_option
             WHERE vehicle_id = ?1 AND with_insurance = ?2",
            params![vehicle_id, from_bool(with_insurance)],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO vehicle_financing_option (
                    vehicle_id, entity_id, interest_rate, term_months, with_insurance,
                    monthly_fee, reference_code, rank, is_selected, batch_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for option in options {
                insert.execute(params![
                    vehicle_id,
                    option.entity_id,
                    option.rate,
                    option.term_months as i64,
                    from_bool(with_insurance),
                    option.monthly_fee,
                    option.reference_code,
                    option.rank as i64,
                    from_bool(option.is_selected),
                    batch_id,
                ])?;
            }
        }

        let selected = options.iter().find(|o| o.is_selected);
        let min_fee = selected.map(|o| o.monthly_fee);
        let min_term = selected.map(|o| o.term_months as i64);
        let sql = if with_insurance {
            "UPDATE vehicle SET min_fee_with_insurance = ?1, min_fee_term_with_insurance = ?2,
                                financing_updated_at = ?3
             WHERE id = ?4"
        } else {
            "UPDATE vehicle SET min_fee_without_insurance = ?1, min_fee_term_without_insurance = ?2,
                                financing_updated_at = ?3
             WHERE id = ?4"
        };
        let changed = tx.execute(sql, params![min_fee, min_term, updated_at, vehicle_id])?;
        if changed == 0 {
            // Dropping the transaction rolls back the delete/insert.
            return Err(FinanceError::UnknownVehicle { id: vehicle_id });
        }

        tx.commit()?;
        Ok(())
    }

    /// Stored options for one vehicle and insurance mode, in rank order.
    pub fn financing_options(
        &self,
        vehicle_id: VehicleId,
        with_insurance: bool,
    ) -> FinanceResult<Vec<StoredFinancingOption>> {
        let mut stmt = self.conn.prepare(
            "SELECT vehicle_id, entity_id, interest_rate, term_months, with_insurance,
                    monthly_fee, reference_code, rank, is_selected, batch_id
             FROM vehicle_financing_option
             WHERE vehicle_id = ?1 AND with_insurance = ?2
             ORDER BY rank ASC",
        )?;
        let options = stmt
            .query_map(params![vehicle_id, from_bool(with_insurance)], |row| {
                Ok(StoredFinancingOption {
                    vehicle_id:     row.get(0)?,
                    entity_id:      row.get(1)?,
                    rate:           row.get(2)?,
                    term_months:    row.get::<_, i64>(3)? as u32,
                    with_insurance: to_bool(row.get(4)?),
                    monthly_fee:    row.get(5)?,
                    reference_code: row.get(6)?,
                    rank:           row.get::<_, i64>(7)? as u32,
                    is_selected:    to_bool(row.get(8)?),
                    batch_id:       row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options)
    }
}
