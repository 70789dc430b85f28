//! Column metadata for the standardized output files.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: &'static str,
    pub levels: &'static str,
    pub example: &'static str,
    pub mandatory: bool,
    pub definition: &'static str,
}

const fn column(
    name: &'static str,
    column_type: &'static str,
    levels: &'static str,
    example: &'static str,
    mandatory: bool,
    definition: &'static str,
) -> ColumnSpec {
    ColumnSpec {
        name,
        column_type,
        levels,
        example,
        mandatory,
        definition,
    }
}

const EXAMPLE_ID: &str = "123e4567-e89b-12d3-a456-426614174000";
const EXAMPLE_DATASET_ID: &str = "987fcdeb-51a2-12d3-a456-426614174000";

pub const POI_SCHEMA: [ColumnSpec; 10] = [
    column("poi_id", "UUID", "", EXAMPLE_ID, true, "Unique identifier for the POI"),
    column("dataset_id", "UUID", "", EXAMPLE_DATASET_ID, true, "Unique identifier for the dataset"),
    column("lat", "float", "", "36.7538", true, "Latitude coordinate"),
    column("lon", "float", "", "3.0588", true, "Longitude coordinate"),
    column("poi_type", "string", "", "school", true, "Type of point of interest"),
    column("is_public", "boolean", "", "True", false, "Whether the POI is public or private"),
    column("poi_subtype", "string", "", "primary school", false, "Specific subtype of the POI"),
    column("country_code", "string", "", "DZA", true, "ISO 3166-1 alpha-3 country code"),
    column("is_connected", "boolean", "", "True", false, "Whether the POI has connectivity"),
    column("connectivity_type", "string", "", "4G", false, "Type of internet connectivity"),
];

pub const CELL_SITE_SCHEMA: [ColumnSpec; 9] = [
    column("ict_id", "UUID", "", EXAMPLE_ID, true, "Cell tower identifier"),
    column("dataset_id", "UUID", "", EXAMPLE_DATASET_ID, true, "Unique identifier for the dataset"),
    column("latitude", "float", "", "38.988755", true, "Cell tower geographical latitude"),
    column("longitude", "float", "", "1.401938", true, "Cell tower geographical longitude"),
    column("operator_name", "string", "", "TelOperator", false, "Mobile network operator name"),
    column(
        "radio_type",
        "string",
        "LTE, UMTS, GSM, CDMA",
        "LTE",
        true,
        "Type of radio transmission technology",
    ),
    column("antenna_height_m", "float", "", "25", true, "Antenna height on the tower or building"),
    column(
        "backhaul_type",
        "string",
        "fiber, microwave, satellite",
        "fiber",
        false,
        "Type of backhaul connectivity of the cell tower",
    ),
    column("backhaul_throughput_mbps", "float", "", "1000", false, "Equipped throughput of the backhaul"),
];

pub const TRANSMISSION_NODE_SCHEMA: [ColumnSpec; 9] = [
    column("ict_id", "UUID", "", EXAMPLE_ID, true, "Node identifier"),
    column("dataset_id", "UUID", "", EXAMPLE_DATASET_ID, true, "Unique identifier for the dataset"),
    column("latitude", "float", "", "38.988755", true, "Geographical latitude"),
    column("longitude", "float", "", "1.401938", true, "Geographical longitude"),
    column("operator_name", "string", "", "TelOperator", false, "Name of the mobile operator"),
    column(
        "infrastructure_type",
        "string",
        "fiber, microwave, other",
        "fiber",
        true,
        "Type of Infrastructure",
    ),
    column(
        "node_status",
        "string",
        "operational, planned, under construction",
        "operational",
        true,
        "Status of the node",
    ),
    column(
        "equipped_capacity_mbps",
        "float",
        "",
        "1000",
        false,
        "Equipped bandwidth ready for use to connect subscribers",
    ),
    column(
        "potential_capacity_mbps",
        "float",
        "",
        "2000",
        false,
        "Total theoretical bandwidth available for subscriber connections",
    ),
];

pub const COVERAGE_SCHEMA: [ColumnSpec; 6] = [
    column("coverage_id", "UUID", "", EXAMPLE_ID, true, "Unique identifier for the coverage area"),
    column("dataset_id", "UUID", "", EXAMPLE_DATASET_ID, true, "Unique identifier for the dataset"),
    column("signal_strength_dbm", "float", "", "-93", true, "Mobile signal strength in dBm for coverage"),
    column("operator_name", "string", "", "TelOperator", false, "Name of the mobile operator"),
    column("geometry", "geometry", "polygon", "POLYGON((...))", true, "Polygon geometry of coverage area"),
    column("coverage", "integer", "1", "1", true, "Binary value indicating coverage"),
];

pub fn column_names(schema: &[ColumnSpec]) -> Vec<&'static str> {
    schema.iter().map(|c| c.name).collect()
}

pub fn render_table(title: &str, schema: &[ColumnSpec]) -> String {
    let header = ["column_name", "column_type", "levels", "example", "mandatory", "definition"];
    let rows: Vec<[&str; 6]> = schema
        .iter()
        .map(|c| {
            [
                c.name,
                c.column_type,
                c.levels,
                c.example,
                if c.mandatory { "Yes" } else { "No" },
                c.definition,
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in rows.iter() {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[&str; 6]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        format!("| {} |", padded.join(" | ").trim_end())
    };
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut lines = vec![title.to_string(), line(&header), format!("|-{}-|", rule.join("-|-"))];
    lines.extend(rows.iter().map(line));
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_sets() {
        assert_eq!(
            column_names(&POI_SCHEMA),
            vec![
                "poi_id",
                "dataset_id",
                "lat",
                "lon",
                "poi_type",
                "is_public",
                "poi_subtype",
                "country_code",
                "is_connected",
                "connectivity_type"
            ]
        );
        assert_eq!(column_names(&CELL_SITE_SCHEMA)[5], "radio_type");
        assert_eq!(column_names(&TRANSMISSION_NODE_SCHEMA)[6], "node_status");
        assert_eq!(COVERAGE_SCHEMA.iter().filter(|c| !c.mandatory).count(), 1);
    }

    #[test]
    fn table_lists_every_column() {
        let table = render_table("Cell sites", &CELL_SITE_SCHEMA);
        assert!(table.starts_with("Cell sites\n"));
        // title, header, rule and one line per column
        assert_eq!(table.lines().count(), 3 + CELL_SITE_SCHEMA.len());
        assert!(table.contains("fiber, microwave, satellite"));
        assert!(table.contains("| backhaul_type "));
        assert!(table.ends_with("|\n"));
        assert!(table.lines().nth(2).unwrap().starts_with("|-----------"));
    }
}
