// src/extractors/lookup.rs

use serde::Serialize;

use super::codes::CodeType;

/// Category information for a code, empty strings when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeLookup {
    pub category: String,
    pub subcategory: String,
    pub description: String,
}

/// An inclusive range of codes sharing a category.
struct CodeRange {
    /// Leading letter for HCPCS ranges, `U` suffix for PLA ranges.
    shape: RangeShape,
    start: u32,
    end: u32,
    category: &'static str,
    description: &'static str,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RangeShape {
    Numeric,
    Pla,
    Letter(char),
}

const fn numeric(start: u32, end: u32, category: &'static str, description: &'static str) -> CodeRange {
    CodeRange { shape: RangeShape::Numeric, start, end, category, description }
}

const fn letter_range(
    prefix: char,
    start: u32,
    end: u32,
    category: &'static str,
    description: &'static str,
) -> CodeRange {
    CodeRange { shape: RangeShape::Letter(prefix), start, end, category, description }
}

/// The whole `X0000`..=`X9999` block for one prefix.
const fn letter(prefix: char, category: &'static str, description: &'static str) -> CodeRange {
    letter_range(prefix, 0, 9999, category, description)
}

// First matching range wins, so overlapping CPT ranges resolve in table order.
static CODE_RANGES: &[CodeRange] = &[
    numeric(100, 1999, "Anesthesia", "Anesthesia for surgical procedures"),
    numeric(10021, 69990, "Surgery", "Surgical procedures across body systems"),
    numeric(70010, 79999, "Radiology", "Diagnostic imaging and radiation oncology services"),
    numeric(80047, 89398, "Pathology and Laboratory", "Lab tests including blood panels and cytopathology"),
    numeric(90281, 99607, "Medicine", "Medical services such as immunology, psychiatry, dialysis"),
    numeric(99202, 99499, "Evaluation and Management", "Office visits, hospital care, consultations"),
    CodeRange {
        shape: RangeShape::Pla,
        start: 1,
        end: 389,
        category: "PLA (Proprietary Lab Analyses)",
        description: "Lab tests assigned to specific manufacturers",
    },
    numeric(99091, 99499, "E/M (Misc)", "Additional evaluation and management services"),
    letter_range('A', 0, 999, "Transportation Services", "Ambulance and non-emergency transport"),
    letter('B', "Enteral and Parenteral Therapy", "Nutritional therapy and equipment"),
    letter('C', "Temporary Codes", "Temporary outpatient hospital codes (CMS)"),
    letter('D', "Dental Procedures", "Dental services and procedures"),
    letter('E', "Durable Medical Equipment", "Wheelchairs, prosthetics, oxygen equipment"),
    letter('G', "Procedures & Professional Services", "CMS-assigned codes for Medicare services"),
    letter('H', "Behavioral Health", "Mental health, substance abuse treatment"),
    letter('J', "Drugs (Injectable)", "Drugs administered other than oral method"),
    letter('K', "Temporary Codes", "Temporary DME codes not covered elsewhere"),
    letter('L', "Orthotics and Prosthetics", "Braces, artificial limbs"),
    letter('M', "Medical Services", "Therapy, assessments, and testing"),
    letter('P', "Pathology and Lab", "Clinical diagnostic lab services"),
    letter('Q', "Temporary Codes", "CMS-assigned temporary codes"),
    letter('R', "Diagnostic Radiology", "Radiopharmaceutical imaging and testing"),
    letter('S', "Private Payer Codes", "HCPCS codes used by commercial payers"),
    letter('T', "State Medicaid Codes", "Medicaid-specific services and supplies"),
    letter('V', "Vision and Hearing", "Eyeglasses, hearing aids, lenses"),
];

/// Splits a code into its range shape and numeric part.
fn parse_shape(code: &str) -> Option<(RangeShape, u32)> {
    if let Some(digits) = code.strip_suffix('U') {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return digits.parse().ok().map(|n| (RangeShape::Pla, n));
        }
        return None;
    }

    let mut chars = code.chars();
    match chars.next()? {
        c if c.is_ascii_digit() => {
            if code.chars().all(|c| c.is_ascii_digit()) {
                code.parse().ok().map(|n| (RangeShape::Numeric, n))
            } else {
                None
            }
        }
        c if c.is_ascii_uppercase() => {
            let rest = chars.as_str();
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                rest.parse().ok().map(|n| (RangeShape::Letter(c), n))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn subcategory(shape: RangeShape) -> &'static str {
    match shape {
        RangeShape::Numeric => "CPT Code",
        RangeShape::Pla => "PLA Code",
        RangeShape::Letter(_) => "HCPCS Code",
    }
}

/// Looks up the category and description of a CPT, HCPCS or PLA code.
pub fn lookup_code(code: &str) -> CodeLookup {
    let Some((shape, number)) = parse_shape(code.trim()) else {
        return CodeLookup::default();
    };

    let mut lookup = CodeLookup {
        subcategory: subcategory(shape).to_string(),
        ..CodeLookup::default()
    };

    if let Some(range) = CODE_RANGES
        .iter()
        .find(|r| r.shape == shape && (r.start..=r.end).contains(&number))
    {
        lookup.category = range.category.to_string();
        lookup.description = range.description.to_string();
    }

    lookup
}

/// The code family a bare code string looks like, if any.
pub fn classify(code: &str) -> Option<CodeType> {
    parse_shape(code.trim()).map(|(shape, _)| match shape {
        RangeShape::Numeric => CodeType::Cpt,
        RangeShape::Pla => CodeType::Pla,
        RangeShape::Letter(_) => CodeType::Hcpcs,
    })
}
