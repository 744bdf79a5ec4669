// 🗄️ Dataset Loader - SQLite → in-memory Dataset
// Reads the five relations, normalizes identifiers, checks integrity.
//
// Identifier columns may hold INTEGER, integral REAL, decimal TEXT or a
// little-endian unsigned BLOB (1-8 bytes). All of them end up as i64.

use crate::dataset::{
    Dataset, CAPABILITIES, COMPANIES, COMPANY_CAPABILITIES, PRODUCTS, PRODUCT_CAPABILITIES,
};
use crate::entities::{Capability, CapabilityId, Company, CompanyId, Product, ProductId};
use crate::error::{LoadError, LoadResult};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// IDENTIFIER DECODING
// ============================================================================

/// Decode a fixed-width little-endian unsigned integer (1-8 bytes)
pub fn decode_le_bytes(bytes: &[u8]) -> Result<i64, String> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(format!("blob of {} bytes, expected 1-8", bytes.len()));
    }

    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    let value = u64::from_le_bytes(buf);

    i64::try_from(value).map_err(|_| format!("blob value {} does not fit in i64", value))
}

/// Normalize one identifier cell to a plain integer
pub fn decode_identifier(value: ValueRef<'_>) -> Result<i64, String> {
    match value {
        ValueRef::Integer(i) => Ok(i),
        ValueRef::Blob(bytes) => decode_le_bytes(bytes),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| "text is not UTF-8".to_string())?;
            text.trim()
                .parse::<i64>()
                .map_err(|_| format!("text {:?} is not an integer", text))
        }
        ValueRef::Real(f) => {
            if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err(format!("real {} is not an integral identifier", f))
            }
        }
        ValueRef::Null => Err("NULL".to_string()),
    }
}

fn id_column(
    row: &Row<'_>,
    idx: usize,
    relation: &'static str,
    column: &'static str,
) -> LoadResult<i64> {
    let value = row
        .get_ref(idx)
        .map_err(|source| LoadError::Query { relation, source })?;

    decode_identifier(value).map_err(|detail| LoadError::InvalidIdentifier {
        relation,
        column,
        detail,
    })
}

/// Text cell; None for NULL and non-text values
fn optional_text(row: &Row<'_>, idx: usize, relation: &'static str) -> LoadResult<Option<String>> {
    let value = row
        .get_ref(idx)
        .map_err(|source| LoadError::Query { relation, source })?;

    Ok(match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    })
}

fn required_text(
    row: &Row<'_>,
    idx: usize,
    relation: &'static str,
    column: &'static str,
    id: i64,
) -> LoadResult<String> {
    optional_text(row, idx, relation)?.ok_or(LoadError::InvalidText {
        relation,
        column,
        id,
    })
}

// ============================================================================
// RELATION READERS
// ============================================================================

/// Run `sql` against `relation` and map every row
fn read_rows<T>(
    conn: &Connection,
    relation: &'static str,
    sql: &str,
    mut map: impl FnMut(&Row<'_>) -> LoadResult<T>,
) -> LoadResult<Vec<T>> {
    let query_err = |source| LoadError::Query { relation, source };

    let mut stmt = conn.prepare(sql).map_err(query_err)?;
    let mut rows = stmt.query([]).map_err(query_err)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(query_err)? {
        out.push(map(row)?);
    }

    debug!(relation, rows = out.len(), "relation read");
    Ok(out)
}

pub fn read_capabilities(conn: &Connection) -> LoadResult<Vec<Capability>> {
    read_rows(
        conn,
        CAPABILITIES,
        "SELECT kapabilitet_id, navn FROM Produktionskapabiliteter",
        |row| {
            let id = id_column(row, 0, CAPABILITIES, "kapabilitet_id")?;
            let name = required_text(row, 1, CAPABILITIES, "navn", id)?;
            Ok(Capability::new(id, name))
        },
    )
}

pub fn read_products(conn: &Connection) -> LoadResult<Vec<Product>> {
    read_rows(
        conn,
        PRODUCTS,
        "SELECT produkt_id, navn FROM Produktbeskrivelser",
        |row| {
            let id = id_column(row, 0, PRODUCTS, "produkt_id")?;
            let name = required_text(row, 1, PRODUCTS, "navn", id)?;
            Ok(Product::new(id, name))
        },
    )
}

pub fn read_companies(conn: &Connection) -> LoadResult<Vec<Company>> {
    let companies = read_rows(
        conn,
        COMPANIES,
        "SELECT virksomhed_id, navn, lokation, website, egnethed_forsvar FROM Virksomheder",
        |row| {
            Ok(Company {
                id: CompanyId(id_column(row, 0, COMPANIES, "virksomhed_id")?),
                name: optional_text(row, 1, COMPANIES)?,
                location: optional_text(row, 2, COMPANIES)?,
                website: optional_text(row, 3, COMPANIES)?,
                suitability: optional_text(row, 4, COMPANIES)?,
            })
        },
    )?;

    let nameless = companies.iter().filter(|c| c.name.is_none()).count();
    if nameless > 0 {
        warn!(nameless, "companies without a name are left out of combination search");
    }

    Ok(companies)
}

pub fn read_product_capabilities(conn: &Connection) -> LoadResult<Vec<(ProductId, CapabilityId)>> {
    read_rows(
        conn,
        PRODUCT_CAPABILITIES,
        "SELECT produkt_id, kapabilitet_id FROM ProduktKapabilitet",
        |row| {
            Ok((
                ProductId(id_column(row, 0, PRODUCT_CAPABILITIES, "produkt_id")?),
                CapabilityId(id_column(row, 1, PRODUCT_CAPABILITIES, "kapabilitet_id")?),
            ))
        },
    )
}

pub fn read_company_capabilities(conn: &Connection) -> LoadResult<Vec<(CompanyId, CapabilityId)>> {
    read_rows(
        conn,
        COMPANY_CAPABILITIES,
        "SELECT virksomhed_id, kapabilitet_id FROM VirksomhedKapabilitet",
        |row| {
            Ok((
                CompanyId(id_column(row, 0, COMPANY_CAPABILITIES, "virksomhed_id")?),
                CapabilityId(id_column(row, 1, COMPANY_CAPABILITIES, "kapabilitet_id")?),
            ))
        },
    )
}

// ============================================================================
// LOADING
// ============================================================================

/// Read and validate all five relations from an open connection
pub fn load_dataset(conn: &Connection) -> LoadResult<Dataset> {
    let capabilities = read_capabilities(conn)?;
    let products = read_products(conn)?;
    let companies = read_companies(conn)?;
    let product_links = read_product_capabilities(conn)?;
    let company_links = read_company_capabilities(conn)?;

    let dataset = Dataset::from_parts(
        capabilities,
        products,
        companies,
        product_links,
        company_links,
    )?;

    let stats = dataset.stats();
    info!(
        capabilities = stats.capabilities,
        products = stats.products,
        companies = stats.companies,
        product_links = stats.product_links,
        company_links = stats.company_links,
        "dataset loaded"
    );

    Ok(dataset)
}

/// Open a SQLite dataset read-only and load it
pub fn open_dataset(path: &Path) -> LoadResult<Dataset> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    load_dataset(&conn)
}

// ============================================================================
// SCHEMA (for imports and fixtures)
// ============================================================================

/// Create the five relations if missing
///
/// No foreign keys: integrity is checked on load, so imported data with
/// dangling references is still inspectable.
pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS Produktionskapabiliteter (
            kapabilitet_id INTEGER PRIMARY KEY,
            navn TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS Produktbeskrivelser (
            produkt_id INTEGER PRIMARY KEY,
            navn TEXT NOT NULL,
            beskrivelse TEXT
        );
        CREATE TABLE IF NOT EXISTS ProduktKapabilitet (
            produkt_id INTEGER NOT NULL,
            kapabilitet_id INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS Virksomheder (
            virksomhed_id INTEGER PRIMARY KEY,
            navn TEXT,
            lokation TEXT,
            website TEXT,
            egnethed_forsvar TEXT
        );
        CREATE TABLE IF NOT EXISTS VirksomhedKapabilitet (
            virksomhed_id,
            kapabilitet_id
        );",
    )
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// Relation name + the columns read from its CSV export
const IMPORT_LAYOUT: [(&str, &[&str]); 5] = [
    (CAPABILITIES, &["kapabilitet_id", "navn"]),
    (PRODUCTS, &["produkt_id", "navn"]),
    (PRODUCT_CAPABILITIES, &["produkt_id", "kapabilitet_id"]),
    (
        COMPANIES,
        &["virksomhed_id", "navn", "lokation", "website", "egnethed_forsvar"],
    ),
    (COMPANY_CAPABILITIES, &["virksomhed_id", "kapabilitet_id"]),
];

/// Rows written per relation
#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    pub relations: Vec<(&'static str, usize)>,
}

impl ImportStats {
    pub fn total(&self) -> usize {
        self.relations.iter().map(|(_, n)| n).sum()
    }
}

/// Import `<Relation>.csv` files from `dir` into `conn`
///
/// Empty cells become NULL. Id columns are stored as written; column
/// affinity turns decimal text into integers and the loader validates them.
pub fn import_csv_dir(dir: &Path, conn: &Connection) -> LoadResult<ImportStats> {
    setup_database(conn).map_err(|source| LoadError::Write {
        relation: CAPABILITIES,
        source,
    })?;

    let mut stats = ImportStats::default();

    for (relation, columns) in IMPORT_LAYOUT {
        let path = dir.join(format!("{}.csv", relation));
        let count = import_relation(conn, &path, relation, columns)?;
        info!(relation, rows = count, "relation imported");
        stats.relations.push((relation, count));
    }

    Ok(stats)
}

fn import_relation(
    conn: &Connection,
    path: &Path,
    relation: &'static str,
    columns: &[&'static str],
) -> LoadResult<usize> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let write_err = |source| LoadError::Write { relation, source };

    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = rdr.headers().map_err(csv_err)?.clone();

    let mut positions = Vec::with_capacity(columns.len());
    for &column in columns {
        let pos = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })?;
        positions.push(pos);
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        relation,
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let tx = conn.unchecked_transaction().map_err(write_err)?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&sql).map_err(write_err)?;
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            let values: Vec<Option<&str>> = positions
                .iter()
                .map(|&pos| record.get(pos).map(str::trim).filter(|v| !v.is_empty()))
                .collect();
            stmt.execute(rusqlite::params_from_iter(values))
                .map_err(write_err)?;
            count += 1;
        }
    }
    tx.commit().map_err(write_err)?;

    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use std::fs;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        conn.execute_batch(
            "INSERT INTO Produktionskapabiliteter VALUES (1, 'Fræsning'), (2, 'Drejning'), (3, 'Svejsning');
             INSERT INTO Produktbeskrivelser VALUES (10, 'Beslag', 'Stålbeslag');
             INSERT INTO ProduktKapabilitet VALUES (10, 1), (10, 2), (10, 3);
             INSERT INTO Virksomheder VALUES
                (1, 'Alfa', 'Aarhus', 'https://alfa.dk', 'Høj'),
                (2, 'Beta', 'Odense', NULL, NULL),
                (3, 'Gamma', 'Aalborg', NULL, 'Middel');",
        )
        .unwrap();

        // Join table with identifiers as little-endian blobs of mixed width
        let links: [(Vec<u8>, Vec<u8>); 4] = [
            (1i64.to_le_bytes().to_vec(), 1i64.to_le_bytes().to_vec()),
            (1i64.to_le_bytes().to_vec(), 2i64.to_le_bytes().to_vec()),
            (2u32.to_le_bytes().to_vec(), 3u32.to_le_bytes().to_vec()),
            (vec![3], vec![1]),
        ];
        for (company, cap) in links {
            conn.execute(
                "INSERT INTO VirksomhedKapabilitet VALUES (?1, ?2)",
                params![company, cap],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO VirksomhedKapabilitet VALUES (?1, ?2)",
            params![3i64, 2i64],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO VirksomhedKapabilitet VALUES (?1, ?2)",
            params![3i64, 3i64],
        )
        .unwrap();

        conn
    }

    #[test]
    fn test_decode_le_bytes() {
        assert_eq!(decode_le_bytes(&[0x2a]), Ok(42));
        assert_eq!(decode_le_bytes(&[0x01, 0x01]), Ok(257));
        assert_eq!(decode_le_bytes(&300i64.to_le_bytes()), Ok(300));
        assert!(decode_le_bytes(&[]).is_err());
        assert!(decode_le_bytes(&[0u8; 9]).is_err());
        assert!(decode_le_bytes(&u64::MAX.to_le_bytes()).is_err());
    }

    #[test]
    fn test_decode_identifier_variants() {
        assert_eq!(decode_identifier(ValueRef::Integer(7)), Ok(7));
        assert_eq!(decode_identifier(ValueRef::Text(b" 12 ")), Ok(12));
        assert_eq!(decode_identifier(ValueRef::Real(5.0)), Ok(5));
        assert_eq!(decode_identifier(ValueRef::Blob(&[9, 0, 0, 0])), Ok(9));
        assert!(decode_identifier(ValueRef::Real(5.5)).is_err());
        assert!(decode_identifier(ValueRef::Text(b"abc")).is_err());
        assert!(decode_identifier(ValueRef::Null).is_err());
    }

    #[test]
    fn test_load_dataset_normalizes_blob_ids() {
        let conn = fixture();
        let ds = load_dataset(&conn).unwrap();

        let names = |id: i64| -> Vec<String> {
            ds.capabilities_of(CompanyId(id))
                .iter()
                .map(|c| c.name.clone())
                .collect()
        };

        assert_eq!(names(1), vec!["Fræsning", "Drejning"]);
        assert_eq!(names(2), vec!["Svejsning"]);
        assert_eq!(names(3), vec!["Fræsning", "Drejning", "Svejsning"]);
        assert_eq!(ds.stats().company_links, 6);
    }

    #[test]
    fn test_load_dataset_reads_company_fields() {
        let conn = fixture();
        let ds = load_dataset(&conn).unwrap();

        let beta = ds.company_by_name("Beta").unwrap();
        assert_eq!(beta.location.as_deref(), Some("Odense"));
        assert_eq!(beta.website, None);

        let alfa = ds.company(CompanyId(1)).unwrap();
        assert_eq!(alfa.suitability.as_deref(), Some("Høj"));
    }

    #[test]
    fn test_unresolved_join_reference_aborts_load() {
        let conn = fixture();
        conn.execute("INSERT INTO VirksomhedKapabilitet VALUES (42, 1)", [])
            .unwrap();

        let err = load_dataset(&conn).unwrap_err();

        assert!(err.is_integrity());
        assert!(err.to_string().contains("virksomhed_id 42 does not resolve"));
    }

    #[test]
    fn test_undecodable_identifier_aborts_load() {
        let conn = fixture();
        conn.execute(
            "INSERT INTO VirksomhedKapabilitet VALUES (?1, 1)",
            params![vec![0u8; 12]],
        )
        .unwrap();

        let err = load_dataset(&conn).unwrap_err();

        assert!(matches!(
            err,
            LoadError::InvalidIdentifier { column: "virksomhed_id", .. }
        ));
    }

    #[test]
    fn test_missing_relation_is_query_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = load_dataset(&conn).unwrap_err();

        assert!(matches!(err, LoadError::Query { relation: CAPABILITIES, .. }));
        assert!(!err.is_integrity());
    }

    #[test]
    fn test_nameless_company_loads_with_none() {
        let conn = fixture();
        conn.execute(
            "INSERT INTO Virksomheder VALUES (4, NULL, NULL, NULL, NULL)",
            [],
        )
        .unwrap();

        let ds = load_dataset(&conn).unwrap();
        assert_eq!(ds.company(CompanyId(4)).unwrap().name, None);
    }

    #[test]
    fn test_import_csv_dir() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, body: &str| {
            fs::write(dir.path().join(format!("{}.csv", name)), body).unwrap();
        };

        write(CAPABILITIES, "kapabilitet_id,navn\n1,Fræsning\n2,Drejning\n");
        write(PRODUCTS, "produkt_id,navn,beskrivelse\n10,Beslag,Stål\n");
        write(PRODUCT_CAPABILITIES, "produkt_id,kapabilitet_id\n10,1\n10,2\n");
        write(
            COMPANIES,
            "virksomhed_id,navn,lokation,website,egnethed_forsvar\n1,Alfa,Aarhus,,Høj\n2,,Odense,,\n",
        );
        write(COMPANY_CAPABILITIES, "virksomhed_id,kapabilitet_id\n1,1\n1,2\n2,2\n");

        let conn = Connection::open_in_memory().unwrap();
        let stats = import_csv_dir(dir.path(), &conn).unwrap();
        assert_eq!(stats.total(), 2 + 1 + 2 + 2 + 3);

        let ds = load_dataset(&conn).unwrap();
        assert_eq!(ds.product_by_name("Beslag").unwrap().id, ProductId(10));
        assert_eq!(ds.company(CompanyId(1)).unwrap().website, None);
        assert_eq!(ds.company(CompanyId(2)).unwrap().name, None);
        assert_eq!(ds.capabilities_of(CompanyId(1)).len(), 2);
    }

    #[test]
    fn test_import_reports_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(format!("{}.csv", CAPABILITIES)),
            "id,navn\n1,Fræsning\n",
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let err = import_csv_dir(dir.path(), &conn).unwrap_err();

        assert!(matches!(
            err,
            LoadError::MissingColumn { column: "kapabilitet_id", .. }
        ));
    }
}
