use serde::{Deserialize, Serialize};

/// MySQL column types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    /// 8-bit integer
    TinyInt { unsigned: bool },
    /// 16-bit integer
    SmallInt { unsigned: bool },
    /// 32-bit integer
    Int { unsigned: bool },
    /// 64-bit integer
    BigInt { unsigned: bool },
    /// Boolean, stored as tinyint(1)
    Boolean,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Decimal with precision and scale
    Decimal(u8, u8),
    /// Variable-length string with max length
    Varchar(u32),
    /// Up to 64 KiB of text
    Text,
    /// Up to 16 MiB of text
    MediumText,
    /// Up to 4 GiB of text
    LongText,
    /// Date without time
    Date,
    /// Date and time with fractional second precision
    DateTime(u8),
    /// Native JSON document
    Json,
    /// Up to 64 KiB of bytes
    Blob,
    /// Up to 4 GiB of bytes
    LongBlob,
}

/// How an existing column type relates to the declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeChange {
    /// Nothing to do.
    Same,
    /// Declared type holds every value of the existing one.
    Widen,
    /// Declared type is smaller; the column is left alone.
    Narrower,
    /// The types belong to different families.
    Incompatible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Integer { unsigned: bool },
    Float,
    Decimal,
    Text,
    Json,
    Temporal,
    Binary,
}

impl SqlType {
    /// Generate the SQL type declaration, in the form MySQL reports back.
    pub fn to_sql(&self) -> String {
        match self {
            SqlType::TinyInt { unsigned } => with_sign("tinyint", *unsigned),
            SqlType::SmallInt { unsigned } => with_sign("smallint", *unsigned),
            SqlType::Int { unsigned } => with_sign("int", *unsigned),
            SqlType::BigInt { unsigned } => with_sign("bigint", *unsigned),
            SqlType::Boolean => "tinyint(1)".to_string(),
            SqlType::Float => "float".to_string(),
            SqlType::Double => "double".to_string(),
            SqlType::Decimal(p, s) => format!("decimal({},{})", p, s),
            SqlType::Varchar(len) => format!("varchar({})", len),
            SqlType::Text => "text".to_string(),
            SqlType::MediumText => "mediumtext".to_string(),
            SqlType::LongText => "longtext".to_string(),
            SqlType::Date => "date".to_string(),
            SqlType::DateTime(0) => "datetime".to_string(),
            SqlType::DateTime(precision) => format!("datetime({})", precision),
            SqlType::Json => "json".to_string(),
            SqlType::Blob => "blob".to_string(),
            SqlType::LongBlob => "longblob".to_string(),
        }
    }

    /// Parse a `COLUMN_TYPE` value from `information_schema`.
    ///
    /// Integer display widths (`int(11)`, `bigint(20) unsigned`) are dropped,
    /// except `tinyint(1)` which is the boolean convention. `char(n)` and
    /// `tinytext` map onto the varchar they can be widened to. Returns `None`
    /// for other types this tool never declares.
    pub fn parse_column_type(column_type: &str) -> Option<SqlType> {
        let lowered = column_type.trim().to_ascii_lowercase();
        let mut words = lowered.split_whitespace();
        let head = words.next()?;
        let mut unsigned = false;
        for word in words {
            match word {
                "unsigned" => unsigned = true,
                "zerofill" | "signed" | "precision" => {}
                _ => return None,
            }
        }

        let (base, args) = match head.find('(') {
            Some(open) => {
                let close = head.rfind(')')?;
                (&head[..open], Some(&head[open + 1..close]))
            }
            None => (head, None),
        };

        let ty = match base {
            "tinyint" if args == Some("1") && !unsigned => SqlType::Boolean,
            "bool" | "boolean" => SqlType::Boolean,
            "tinyint" => SqlType::TinyInt { unsigned },
            "smallint" => SqlType::SmallInt { unsigned },
            "int" | "integer" => SqlType::Int { unsigned },
            "bigint" => SqlType::BigInt { unsigned },
            "float" => SqlType::Float,
            "double" | "real" => SqlType::Double,
            "decimal" | "numeric" => {
                let (p, s) = match args {
                    Some(args) => match args.split_once(',') {
                        Some((p, s)) => (p.trim().parse().ok()?, s.trim().parse().ok()?),
                        None => (args.trim().parse().ok()?, 0),
                    },
                    None => (10, 0),
                };
                SqlType::Decimal(p, s)
            }
            "varchar" => SqlType::Varchar(args?.trim().parse().ok()?),
            // Fixed-width strings compare as variable-width of the same length.
            "char" => SqlType::Varchar(match args {
                Some(len) => len.trim().parse().ok()?,
                None => 1,
            }),
            "tinytext" => SqlType::Varchar(255),
            "text" => SqlType::Text,
            "mediumtext" => SqlType::MediumText,
            "longtext" => SqlType::LongText,
            "date" => SqlType::Date,
            "datetime" => match args {
                Some(p) => SqlType::DateTime(p.trim().parse().ok()?),
                None => SqlType::DateTime(0),
            },
            "json" => SqlType::Json,
            "blob" => SqlType::Blob,
            "longblob" => SqlType::LongBlob,
            _ => return None,
        };
        Some(ty)
    }

    /// Compare an existing column type against the declared one.
    pub fn compare(existing: &SqlType, declared: &SqlType) -> TypeChange {
        if existing == declared {
            return TypeChange::Same;
        }

        // MariaDB reports JSON columns as longtext.
        if matches!(
            (existing, declared),
            (SqlType::LongText, SqlType::Json) | (SqlType::Json, SqlType::LongText)
        ) {
            return TypeChange::Same;
        }

        let (from, to) = (existing.family(), declared.family());
        if from != to {
            return TypeChange::Incompatible;
        }

        if let (SqlType::Decimal(p1, s1), SqlType::Decimal(p2, s2)) = (existing, declared) {
            let (int1, int2) = (p1.saturating_sub(*s1), p2.saturating_sub(*s2));
            return if s2 >= s1 && int2 >= int1 {
                TypeChange::Widen
            } else if s2 <= s1 && int2 <= int1 {
                TypeChange::Narrower
            } else {
                TypeChange::Incompatible
            };
        }

        match existing.rank().cmp(&declared.rank()) {
            std::cmp::Ordering::Less => TypeChange::Widen,
            std::cmp::Ordering::Equal => TypeChange::Same,
            std::cmp::Ordering::Greater => TypeChange::Narrower,
        }
    }

    fn family(&self) -> Family {
        match self {
            SqlType::TinyInt { unsigned }
            | SqlType::SmallInt { unsigned }
            | SqlType::Int { unsigned }
            | SqlType::BigInt { unsigned } => Family::Integer {
                unsigned: *unsigned,
            },
            SqlType::Boolean => Family::Integer { unsigned: false },
            SqlType::Float | SqlType::Double => Family::Float,
            SqlType::Decimal(_, _) => Family::Decimal,
            SqlType::Varchar(_) | SqlType::Text | SqlType::MediumText | SqlType::LongText => {
                Family::Text
            }
            SqlType::Json => Family::Json,
            SqlType::Date | SqlType::DateTime(_) => Family::Temporal,
            SqlType::Blob | SqlType::LongBlob => Family::Binary,
        }
    }

    fn rank(&self) -> (u32, u32) {
        match self {
            SqlType::TinyInt { .. } | SqlType::Boolean => (1, 0),
            SqlType::SmallInt { .. } => (2, 0),
            SqlType::Int { .. } => (3, 0),
            SqlType::BigInt { .. } => (4, 0),
            SqlType::Float => (1, 0),
            SqlType::Double => (2, 0),
            SqlType::Varchar(len) => (0, *len),
            SqlType::Text => (1, 0),
            SqlType::MediumText => (2, 0),
            SqlType::LongText => (3, 0),
            SqlType::Date => (0, 0),
            SqlType::DateTime(precision) => (1, u32::from(*precision)),
            SqlType::Blob => (1, 0),
            SqlType::LongBlob => (2, 0),
            SqlType::Decimal(_, _) | SqlType::Json => (0, 0),
        }
    }
}

fn with_sign(base: &str, unsigned: bool) -> String {
    if unsigned {
        format!("{} unsigned", base)
    } else {
        base.to_string()
    }
}
