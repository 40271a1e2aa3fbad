//! Sentinel strings embedded in column and table names.
//!
//! The staging rewriter communicates with the SQL printer and the
//! importance post-filter exclusively through these markers. They are fixed
//! strings; the builders and parsers in this module are the only code that
//! is allowed to know their exact layout.

use crate::Float;

pub const NO_JOIN_KEY: &str = "$RFE_NO_JOIN_KEY";
pub const ROWID: &str = "$RFE_ROWID";
pub const ROWID_COMPARISON_ONLY: &str = "rowid, comparison only";

pub const GENERATED_TS: &str = "$RFE_GENERATED_TS";
pub const UPPER_TS: &str = "$RFE_UPPER_TS";
pub const LOWER_TS: &str = "$RFE_LOWER_TS";
pub const OTHER_TIME_STAMP: &str = "$RFE_OTHER_TS";

pub const TEXT_FIELD: &str = "$RFE_TEXT_FIELD__";
pub const POPULATION: &str = "$RFE_POPULATION__";
pub const T1_OR_T2: &str = "t1_or_t2";

pub const MULTIPLE_JOIN_KEY_BEGIN: &str = "$RFE_MULTIPLE_JOIN_KEY_BEGIN__";
pub const MULTIPLE_JOIN_KEY_END: &str = "__$RFE_MULTIPLE_JOIN_KEY_END";
pub const MULTIPLE_JOIN_KEY_SEP: &str = "$RFE_JK_SEP$";

pub const JOINED_TABLE_BEGIN: &str = "$RFE_JOINED_BEGIN__";
pub const JOINED_TABLE_END: &str = "__$RFE_JOINED_END";
pub const FIELD_SEP: &str = "$RFE_F$";

pub const COLUMN_BEGIN: &str = "$RFE_COLUMN_BEGIN__";
pub const COLUMN_END: &str = "__$RFE_COLUMN_END";

pub const HOUR_BEGIN: &str = "$RFE_HOUR_BEGIN__";
pub const HOUR_END: &str = "__$RFE_HOUR_END";
pub const MINUTE_BEGIN: &str = "$RFE_MINUTE_BEGIN__";
pub const MINUTE_END: &str = "__$RFE_MINUTE_END";
pub const MONTH_BEGIN: &str = "$RFE_MONTH_BEGIN__";
pub const MONTH_END: &str = "__$RFE_MONTH_END";
pub const WEEKDAY_BEGIN: &str = "$RFE_WEEKDAY_BEGIN__";
pub const WEEKDAY_END: &str = "__$RFE_WEEKDAY_END";
pub const YEAR_BEGIN: &str = "$RFE_YEAR_BEGIN__";
pub const YEAR_END: &str = "__$RFE_YEAR_END";

pub const EMAIL_DOMAIN_BEGIN: &str = "$RFE_EMAIL_DOMAIN_BEGIN__";
pub const EMAIL_DOMAIN_END: &str = "__$RFE_EMAIL_DOMAIN_END";

pub const SUBSTRING_BEGIN: &str = "$RFE_SUBSTRING_BEGIN__";
pub const SUBSTRING_END: &str = "__$RFE_SUBSTRING_END";

pub const OPEN_BRACKET: &str = "( ";
pub const CLOSE_BRACKET: &str = " )";

/// Canonical textual form for floats embedded in generated names.
///
/// Whole numbers print without a fractional part so that the same shift
/// always yields byte-identical names.
pub fn format_float(value: Float) -> String {
    if value.fract() == 0.0 && value.abs() < 1.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// The name of a time-stamp column generated by shifting `base` by `diff`.
pub fn generated_ts_name(base: &str, diff: Float) -> String {
    if base.contains(ROWID) {
        return format!(
            "{}{} + {}{}",
            OPEN_BRACKET,
            base,
            format_float(diff),
            CLOSE_BRACKET
        );
    }
    format!("{}({}, {})", GENERATED_TS, base, format_float(diff))
}

/// Encodes a composite join key made up of several column names.
pub fn make_multiple_join_key_name(names: &[String]) -> String {
    format!(
        "{}{}{}",
        MULTIPLE_JOIN_KEY_BEGIN,
        names.join(MULTIPLE_JOIN_KEY_SEP),
        MULTIPLE_JOIN_KEY_END
    )
}

/// Splits a join-key name into its components. Non-composite names are
/// returned as a single-element vector.
pub fn parse_join_key_name(name: &str) -> Vec<String> {
    let Some(stripped) = name.strip_prefix(MULTIPLE_JOIN_KEY_BEGIN) else {
        return vec![name.to_string()];
    };
    let Some(inner) = stripped.strip_suffix(MULTIPLE_JOIN_KEY_END) else {
        return vec![name.to_string()];
    };
    inner
        .split(MULTIPLE_JOIN_KEY_SEP)
        .map(|s| s.to_string())
        .collect()
}

/// All five edge fields plus the joined name and alias of a many-to-one or
/// one-to-one join that has been inlined into a composite table name.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinedTableDesc {
    pub name: String,
    pub alias: String,
    pub one_to_one: bool,
    pub join_key_used: String,
    pub other_join_key_used: String,
    pub time_stamp_used: String,
    pub other_time_stamp_used: String,
    pub upper_time_stamp_used: String,
}

/// Encodes an inlined join as a name segment appended to the parent table
/// name. `parse_table_name` is the exact inverse.
#[allow(clippy::too_many_arguments)]
pub fn make_table_name(
    join_key_used: &str,
    other_join_key_used: &str,
    time_stamp_used: &str,
    other_time_stamp_used: &str,
    upper_time_stamp_used: &str,
    joined_name: &str,
    alias: &str,
    one_to_one: bool,
) -> String {
    let fields = [
        joined_name,
        alias,
        if one_to_one { "1" } else { "0" },
        join_key_used,
        other_join_key_used,
        time_stamp_used,
        other_time_stamp_used,
        upper_time_stamp_used,
    ];
    format!(
        "{}{}{}",
        JOINED_TABLE_BEGIN,
        fields.join(FIELD_SEP),
        JOINED_TABLE_END
    )
}

/// Decomposes a (possibly composite) table name into the base name and the
/// inlined joins encoded in it, in encoding order.
pub fn parse_table_name(full_name: &str) -> (String, Vec<JoinedTableDesc>) {
    let Some(pos) = full_name.find(JOINED_TABLE_BEGIN) else {
        return (full_name.to_string(), Vec::new());
    };

    let base = full_name[..pos].to_string();

    let mut joins = Vec::new();

    let mut rest = &full_name[pos..];

    while let Some(begin) = rest.find(JOINED_TABLE_BEGIN) {
        let after = &rest[begin + JOINED_TABLE_BEGIN.len()..];
        let Some(end) = after.find(JOINED_TABLE_END) else {
            break;
        };
        let fields: Vec<&str> = after[..end].split(FIELD_SEP).collect();
        if fields.len() == 8 {
            joins.push(JoinedTableDesc {
                name: fields[0].to_string(),
                alias: fields[1].to_string(),
                one_to_one: fields[2] == "1",
                join_key_used: fields[3].to_string(),
                other_join_key_used: fields[4].to_string(),
                time_stamp_used: fields[5].to_string(),
                other_time_stamp_used: fields[6].to_string(),
                upper_time_stamp_used: fields[7].to_string(),
            });
        }
        rest = &after[end + JOINED_TABLE_END.len()..];
    }

    (base, joins)
}

/// Qualifies a column carried over from an inlined table with the table name
/// and the alias it received during flattening.
pub fn make_colname(table: &str, alias: &str, colname: &str) -> String {
    format!(
        "{}{}{}{}{}{}",
        COLUMN_BEGIN, table, FIELD_SEP, alias, COLUMN_END, colname
    )
}

/// Splits a qualified column name into its `(table, alias)` origin and the
/// bare column name. Unqualified names return `None` for the origin.
pub fn parse_colname(colname: &str) -> (Option<(String, String)>, String) {
    let Some(stripped) = colname.strip_prefix(COLUMN_BEGIN) else {
        return (None, colname.to_string());
    };
    let Some(end) = stripped.find(COLUMN_END) else {
        return (None, colname.to_string());
    };
    let origin = &stripped[..end];
    let base = &stripped[end + COLUMN_END.len()..];
    let mut parts = origin.splitn(2, FIELD_SEP);
    let table = parts.next().unwrap_or_default().to_string();
    let alias = parts.next().unwrap_or_default().to_string();
    (Some((table, alias)), base.to_string())
}

/// Strips the population suffix from a staged population name.
pub fn strip_population_suffix(name: &str) -> &str {
    name.strip_suffix(POPULATION).unwrap_or(name)
}

/// The original table name behind a (possibly composite, possibly
/// population-suffixed) staged table name.
pub fn base_table_name(name: &str) -> String {
    strip_population_suffix(&parse_table_name(name).0).to_string()
}

/// Rewrites every marker in `name` into its human-readable form.
///
/// Seasonal and e-mail markers become function-call notation, qualified
/// columns become `table.column`, everything else is passed through.
pub fn humanize(name: &str) -> String {
    let replacements: [(&str, &str, &str); 7] = [
        (HOUR_BEGIN, HOUR_END, "hour"),
        (MINUTE_BEGIN, MINUTE_END, "minute"),
        (MONTH_BEGIN, MONTH_END, "month"),
        (WEEKDAY_BEGIN, WEEKDAY_END, "weekday"),
        (YEAR_BEGIN, YEAR_END, "year"),
        (EMAIL_DOMAIN_BEGIN, EMAIL_DOMAIN_END, "email_domain"),
        (SUBSTRING_BEGIN, SUBSTRING_END, "substring"),
    ];

    let mut result = name.to_string();

    for (begin, end, func) in replacements {
        while let Some(pos) = result.find(begin) {
            let after = &result[pos + begin.len()..];
            let Some(close) = after.find(end) else {
                break;
            };
            let inner = humanize(&after[..close]);
            let tail = after[close + end.len()..].to_string();
            result = format!("{}{}( {} ){}", &result[..pos], func, inner, tail);
        }
    }

    if let (Some((table, _alias)), base) = parse_colname(&result) {
        result = format!("{}.{}", table, base);
    }

    if let Some(stripped) = result.strip_prefix(GENERATED_TS) {
        result = format!("generated_ts{}", stripped);
    }

    result
        .replace(NO_JOIN_KEY, "no join key")
        .replace(ROWID, "rowid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ts_name() {
        assert_eq!(
            generated_ts_name("ts", 7.0),
            format!("{}(ts, 7)", GENERATED_TS)
        );
        assert_eq!(
            generated_ts_name("ts", 1.5),
            format!("{}(ts, 1.5)", GENERATED_TS)
        );
    }

    #[test]
    fn test_multiple_join_key_round_trip() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let encoded = make_multiple_join_key_name(&names);
        assert_eq!(parse_join_key_name(&encoded), names);
        assert_eq!(parse_join_key_name("plain"), vec!["plain".to_string()]);
    }

    #[test]
    fn test_table_name_round_trip() {
        let segment = make_table_name("jk", "other_jk", "ts", "other_ts", "", "trans", "t2", false);
        let full = format!("population{}", segment);
        let (base, joins) = parse_table_name(&full);
        assert_eq!(base, "population");
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].name, "trans");
        assert_eq!(joins[0].alias, "t2");
        assert!(!joins[0].one_to_one);
        assert_eq!(joins[0].join_key_used, "jk");
        assert_eq!(joins[0].upper_time_stamp_used, "");
    }

    #[test]
    fn test_colname_round_trip() {
        let qualified = make_colname("trans", "t2", "amount");
        let (origin, base) = parse_colname(&qualified);
        assert_eq!(origin, Some(("trans".to_string(), "t2".to_string())));
        assert_eq!(base, "amount");
    }

    #[test]
    fn test_humanize_seasonal() {
        let name = format!("{}ts{}", HOUR_BEGIN, HOUR_END);
        assert_eq!(humanize(&name), "hour( ts )");
    }

    #[test]
    fn test_humanize_qualified_column() {
        let name = make_colname("trans", "t2", "amount");
        assert_eq!(humanize(&name), "trans.amount");
    }
}
