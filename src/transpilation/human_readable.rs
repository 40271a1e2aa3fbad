use crate::helpers::{marker, ColumnDescription, Schema};
use crate::transpilation::SqlDialectGenerator;

/// The dialect used for display and for the `SQL/` directory of a saved
/// pipeline. Not tied to any particular database.
#[derive(Clone, Copy, Debug, Default)]
pub struct HumanReadableSqlGenerator;

impl HumanReadableSqlGenerator {
    pub fn new() -> Self {
        Self
    }

    fn quote(&self, name: &str) -> String {
        format!("{}{}{}", self.quotechar1(), name, self.quotechar2())
    }

    fn staging_statement(&self, schema: &Schema, needs_targets: bool) -> String {
        let staging_name = self.make_staging_table_name(&schema.name);
        let (prefix, joins) = marker::parse_table_name(&schema.name);
        let base = marker::strip_population_suffix(&prefix).to_string();

        let mut colnames: Vec<String> = Vec::new();
        let mut add_all = |names: &[String]| {
            for name in names {
                colnames.push(self.make_staging_table_column(name, "t1"));
            }
        };

        add_all(&schema.join_keys);
        add_all(&schema.time_stamps);
        add_all(&schema.categoricals);
        add_all(&schema.discretes);
        add_all(&schema.numericals);
        add_all(&schema.text);
        if needs_targets {
            add_all(&schema.targets);
        }

        let mut sql = String::new();
        sql.push_str(&self.drop_table_if_exists(&staging_name));
        sql.push_str(&format!(
            "\nCREATE TABLE {} AS\nSELECT {}\nFROM {} t1",
            self.quote(&staging_name),
            colnames.join(",\n       "),
            self.quote(&base)
        ));

        for join in &joins {
            sql.push_str(&format!(
                "\nLEFT JOIN {} {} ON t1.{} = {}.{}",
                self.quote(&join.name),
                join.alias,
                self.quote(&marker::humanize(&join.join_key_used)),
                join.alias,
                self.quote(&marker::humanize(&join.other_join_key_used)),
            ));
        }

        sql.push(';');
        sql
    }
}

impl SqlDialectGenerator for HumanReadableSqlGenerator {
    fn drop_table_if_exists(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", self.quote(name))
    }

    fn quotechar1(&self) -> char {
        '"'
    }

    fn quotechar2(&self) -> char {
        '"'
    }

    fn make_staging_table_name(&self, name: &str) -> String {
        let base = marker::base_table_name(name);
        format!("{}__STAGING", base.to_uppercase().replace(' ', "_"))
    }

    fn make_staging_tables(
        &self,
        population_needs_targets: bool,
        peripheral_needs_targets: &[bool],
        population_schema: &Schema,
        peripheral_schemata: &[Schema],
    ) -> Vec<String> {
        let mut statements = vec![self.staging_statement(population_schema, population_needs_targets)];
        for (i, schema) in peripheral_schemata.iter().enumerate() {
            let needs_targets = peripheral_needs_targets.get(i).copied().unwrap_or(false);
            statements.push(self.staging_statement(schema, needs_targets));
        }
        statements
    }

    fn make_sql(
        &self,
        table_name: &str,
        autofeature_names: &[String],
        components: &[String],
        targets: &[String],
        categorical_colnames: &[String],
        numerical_colnames: &[String],
    ) -> String {
        let staging_name = self.make_staging_table_name(table_name);

        let mut select_list: Vec<String> = Vec::new();

        for target in targets {
            select_list.push(format!("t1.{}", self.quote(&marker::humanize(target))));
        }

        for name in autofeature_names {
            select_list.push(format!(
                "{}.{}",
                name.to_lowercase(),
                self.quote("value")
            ));
        }

        for name in numerical_colnames.iter().chain(categorical_colnames) {
            select_list.push(self.make_staging_table_column(name, "t1"));
        }

        let mut sql = components.join("\n\n");
        if !sql.is_empty() {
            sql.push_str("\n\n");
        }

        sql.push_str(&format!(
            "SELECT {}\nFROM {} t1",
            select_list.join(",\n       "),
            self.quote(&staging_name)
        ));

        for name in autofeature_names {
            let feature_table = name.to_uppercase();
            sql.push_str(&format!(
                "\nLEFT JOIN {} {} ON t1.rownum = {}.rownum",
                self.quote(&feature_table),
                name.to_lowercase(),
                name.to_lowercase()
            ));
        }

        sql.push(';');
        sql
    }

    fn split_text_fields(&self, desc: &ColumnDescription) -> String {
        let token_table = format!(
            "{}__{}__TOKENS",
            desc.table.to_uppercase(),
            marker::humanize(&desc.name).to_uppercase().replace(' ', "_")
        );
        format!(
            "{}\nCREATE TABLE {} AS\nSELECT rownum, token\nFROM {}, tokenize({});",
            self.drop_table_if_exists(&token_table),
            self.quote(&token_table),
            self.quote(&desc.table),
            self.quote(&marker::humanize(&desc.name)),
        )
    }

    fn make_staging_table_column(&self, colname: &str, alias: &str) -> String {
        let (origin, base) = marker::parse_colname(colname);
        let humanized = marker::humanize(&base);
        match origin {
            Some((_table, join_alias)) => {
                format!("{}.{}", join_alias, self.quote(&humanized))
            }
            None => format!("{}.{}", alias, self.quote(&humanized)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::column_description::Marker;

    #[test]
    fn test_staging_mentions_every_table_once() {
        let generator = HumanReadableSqlGenerator::new();
        let population = Schema {
            name: "population".to_string(),
            join_keys: vec!["id".to_string()],
            targets: vec!["y".to_string()],
            ..Default::default()
        };
        let peripheral = Schema {
            name: "trans".to_string(),
            join_keys: vec!["id".to_string()],
            numericals: vec!["amount".to_string()],
            ..Default::default()
        };
        let statements =
            generator.make_staging_tables(true, &[false], &population, &[peripheral]);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("\"population\""));
        assert!(statements[0].contains("\"y\""));
        assert!(statements[1].contains("\"trans\""));
        assert!(!statements[1].contains("\"y\""));
    }

    #[test]
    fn test_make_staging_table_column_resolves_markers() {
        let generator = HumanReadableSqlGenerator::new();
        let qualified = marker::make_colname("trans", "t2", "amount");
        assert_eq!(
            generator.make_staging_table_column(&qualified, "t1"),
            "t2.\"amount\""
        );
        assert_eq!(
            generator.make_staging_table_column("age", "t1"),
            "t1.\"age\""
        );
    }

    #[test]
    fn test_split_text_fields() {
        let generator = HumanReadableSqlGenerator::new();
        let desc = ColumnDescription::new(Marker::Peripheral, "trans", "comment");
        let sql = generator.split_text_fields(&desc);
        assert!(sql.contains("TRANS__COMMENT__TOKENS"));
        assert!(sql.contains("tokenize"));
    }
}
