use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, XlsxError};

use crate::models::{Language, Property, PropertyType};

/// Sheets in output order
pub const SHEETS: [(PropertyType, &str); 3] = [
    (PropertyType::House, "Houses"),
    (PropertyType::Apartment, "Apartments"),
    (PropertyType::Office, "Offices"),
];

pub const HEADERS: [&str; 26] = [
    "Agent Code",
    "Property Code",
    "Deal Type",
    "Status",
    "City",
    "District",
    "Address",
    "Floor",
    "Total Floors",
    "Living Area",
    "Rooms",
    "Bedrooms",
    "Bathrooms",
    "Plot Size",
    "Registered",
    "Heating Type",
    "Water Supply",
    "Sewage",
    "Price",
    "Owner Properties",
    "Contract Status",
    "Contract Number",
    "Contract End Date",
    "Documents",
    "Creation Date",
    "Last Update",
];

const HEADER_FILL: u32 = 0xCCCCCC;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn flag(value: bool) -> Self {
        Cell::text(if value { "Yes" } else { "No" })
    }

    fn date(value: DateTime<Utc>) -> Self {
        Cell::Text(value.format("%Y-%m-%d").to_string())
    }
}

/// Rows destined for one worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub property_type: PropertyType,
    pub name: &'static str,
    pub rows: Vec<Vec<Cell>>,
}

/// Spreadsheet row for a property, or `None` when it has no detail in `language`
pub fn property_row(property: &Property, language: Language) -> Option<Vec<Cell>> {
    let detail = property.detail(language)?;
    let owner = property.owner.as_ref();

    Some(vec![
        Cell::text(&property.agent_code),
        Cell::text(&property.property_code),
        Cell::text(property.deal_type.as_str()),
        Cell::text(property.status.as_str()),
        Cell::text(&detail.city),
        Cell::text(&detail.district),
        Cell::text(&detail.address),
        Cell::Number(f64::from(detail.floor_number)),
        Cell::Number(f64::from(detail.total_floors)),
        Cell::Number(detail.living_area),
        Cell::Number(f64::from(detail.rooms)),
        Cell::Number(f64::from(detail.bedrooms)),
        Cell::Number(f64::from(detail.bathrooms)),
        Cell::Number(detail.plot_size),
        Cell::flag(detail.registered),
        Cell::text(&detail.heating_type),
        Cell::flag(detail.water_supply),
        Cell::flag(detail.sewage),
        Cell::Number(detail.price),
        owner.map_or(Cell::Empty, |o| Cell::Number(f64::from(o.properties_count))),
        owner.map_or(Cell::Empty, |o| Cell::text(&o.contract_status)),
        owner.map_or(Cell::Empty, |o| Cell::text(&o.contract_number)),
        owner
            .and_then(|o| o.contract_end_date)
            .map_or(Cell::Empty, Cell::date),
        Cell::Number(property.documents.len() as f64),
        Cell::date(property.created_at),
        Cell::date(property.updated_at),
    ])
}

/// Groups properties into the fixed sheet list, dropping those without a
/// detail in `language`
pub fn build_sheets(properties: &[Property], language: Language) -> Vec<Sheet> {
    SHEETS
        .iter()
        .map(|&(property_type, name)| Sheet {
            property_type,
            name,
            rows: properties
                .iter()
                .filter(|p| p.property_type == property_type)
                .filter_map(|p| property_row(p, language))
                .collect(),
        })
        .collect()
}

pub fn write_workbook(sheets: &[Sheet], column_width: f64) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_bold()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(HEADER_FILL));

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;

        for (col, title) in HEADERS.iter().enumerate() {
            let col = col as u16;
            worksheet.write_string_with_format(0, col, *title, &header)?;
            worksheet.set_column_width(col, column_width)?;
        }

        for (index, row) in sheet.rows.iter().enumerate() {
            let row_num = (index + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(value) => {
                        worksheet.write_string(row_num, col, value.as_str())?;
                    }
                    Cell::Number(value) => {
                        worksheet.write_number(row_num, col, *value)?;
                    }
                    Cell::Empty => {}
                }
            }
        }
    }

    workbook.save_to_buffer()
}
