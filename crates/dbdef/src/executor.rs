//! Migration executor.
//!
//! Turns a [`ChangePlan`] into a resulting table definition, either by
//! predicting it (dry-run) or by running the plan through a [`Driver`] and
//! reading the table back.

use tracing::{debug, info};

use crate::diff::ChangePlan;
use crate::driver::Driver;
use crate::error::{DbDefError, Result};
use crate::table::TableDef;

/// Executes change plans against a driver.
#[derive(Debug)]
pub struct Executor<'a, D> {
    driver: &'a D,
}

impl<'a, D: Driver> Executor<'a, D> {
    /// Creates an executor over `driver`.
    #[must_use]
    pub const fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Predicts the table definition after `plan`, without any driver I/O.
    ///
    /// A new table is the desired definition itself. An existing table is
    /// `actual` with the plan applied: the desired columns and indexes plus
    /// whatever was kept because `DROP` was not set.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn plan(
        &self,
        desired: &TableDef,
        actual: Option<&TableDef>,
        plan: &ChangePlan,
    ) -> TableDef {
        match actual {
            Some(actual) if !plan.creates => actual.apply_plan(plan),
            _ => desired.clone(),
        }
    }

    /// Runs `plan` through the driver and returns the table as the driver
    /// reports it afterwards.
    ///
    /// The re-read is the result: engines may clamp types, defaults or
    /// index layouts, so the plan itself is not trusted as the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DbDefError::Driver`] if any driver call fails, and
    /// [`DbDefError::TableMissing`] if the table cannot be read back.
    pub async fn apply(&self, desired: &TableDef, plan: &ChangePlan) -> Result<TableDef> {
        if plan.creates {
            self.driver
                .create_table(desired)
                .await
                .map_err(DbDefError::driver)?;
            info!(
                table = %plan.table,
                columns = plan.column_adds.len(),
                indexes = plan.index_adds.len(),
                "Created table"
            );
        } else if plan.is_empty() {
            debug!(table = %plan.table, "Table is up to date");
        } else {
            self.driver
                .alter_table(&plan.table, plan)
                .await
                .map_err(DbDefError::driver)?;
            info!(
                table = %plan.table,
                added = plan.column_adds.len(),
                modified = plan.column_modifies.len(),
                dropped = plan.column_drops.len(),
                indexes_added = plan.index_adds.len(),
                indexes_dropped = plan.index_drops.len(),
                primary_key = plan.primary_key_replace.is_some(),
                "Altered table"
            );
        }

        self.driver
            .get_table_def(&plan.table)
            .await
            .map_err(DbDefError::driver)?
            .ok_or_else(|| DbDefError::TableMissing(plan.table.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDef;
    use crate::diff::diff_table;
    use crate::index::{IndexDef, IndexKind};
    use crate::memory::MemoryDriver;

    fn desired() -> TableDef {
        let mut def = TableDef::new("user");
        def.set_column(ColumnDef::new("userID", "int").not_null().auto_increment());
        def.set_column(ColumnDef::new("name", "varchar(50)"));
        def.add_index(IndexDef::primary_key("userID"));
        def.add_index(IndexDef::new("name", IndexKind::Index));
        def
    }

    #[test]
    fn plan_for_new_table_echoes_desired() {
        let driver = MemoryDriver::new();
        let executor = Executor::new(&driver);
        let desired = desired();
        let plan = diff_table(&desired, None);
        assert_eq!(executor.plan(&desired, None, &plan), desired);
    }

    #[tokio::test]
    async fn apply_creates_then_reads_back() {
        let driver = MemoryDriver::new();
        let executor = Executor::new(&driver);
        let desired = desired();

        let plan = diff_table(&desired, None);
        let result = executor.apply(&desired, &plan).await.unwrap();
        assert_eq!(result.shape(), desired.shape());
        assert_eq!(driver.table_names().unwrap(), vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn empty_plan_skips_alter() {
        let driver = MemoryDriver::new();
        let desired = desired();
        driver.create_table(&desired).await.unwrap();

        let executor = Executor::new(&driver);
        let actual = driver.get_table_def("user").await.unwrap();
        let plan = diff_table(&desired, actual.as_ref());
        assert!(plan.is_empty());

        let result = executor.apply(&desired, &plan).await.unwrap();
        assert_eq!(result.shape(), desired.shape());
        assert_eq!(driver.alter_count(), 0);
    }

    #[tokio::test]
    async fn driver_errors_are_surfaced() {
        let driver = MemoryDriver::new();
        let executor = Executor::new(&driver);
        let desired = desired();

        // An alter plan against a table that was never created.
        let plan = diff_table(&desired, Some(&TableDef::new("user")));
        let err = executor.apply(&desired, &plan).await.unwrap_err();
        assert!(matches!(err, DbDefError::Driver(_)));
        assert!(err.to_string().contains("user"));
    }
}
