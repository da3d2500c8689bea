// src/security.rs
//
// Upload validation: allowed spreadsheet types, a size ceiling, and a coarse
// byte-signature scan. The scan is a heuristic, not an antivirus: it only
// looks at magic numbers in the first 20 bytes plus a raw "macros" substring
// for ZIP containers, and can both miss and false-positive.

pub const MAX_UPLOAD_BYTES: i64 = 50 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];
const ALLOWED_MIME_TYPES: [&str; 3] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/csv",
];

const EXECUTABLE_SIGNATURES: [&str; 3] = [
    "4d5a",     // PE
    "7f454c46", // ELF
    "cafebabe", // Java class
];

pub fn allowed_mime_type(mime: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime)
}

pub fn validate_file_type(file_name: &str, mime: &str) -> bool {
    let lower = file_name.to_lowercase();
    let extension_ok = match lower.rfind('.') {
        Some(idx) => ALLOWED_EXTENSIONS.contains(&&lower[idx..]),
        None => false,
    };
    extension_ok && allowed_mime_type(mime)
}

pub fn validate_file_size(size: i64) -> bool {
    size > 0 && size <= MAX_UPLOAD_BYTES
}

/// Strips anything that could smuggle path separators into an object key.
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect()
}

#[derive(Debug)]
pub struct ScanReport {
    pub safe: bool,
    pub threats: Vec<String>,
}

pub fn scan_buffer(buffer: &[u8]) -> ScanReport {
    let mut threats = Vec::new();

    let header_hex = hex::encode(&buffer[..buffer.len().min(20)]);

    for signature in EXECUTABLE_SIGNATURES {
        if header_hex.contains(signature) {
            threats.push("Executable file detected".to_string());
            break;
        }
    }

    // ZIP container (xlsx and friends): a raw "macros" token anywhere in the
    // body flags macro-enabled content.
    if header_hex.contains("504b0304") && contains_subslice(buffer, b"macros") {
        threats.push("Macro content detected".to_string());
    }

    if buffer.is_empty() {
        threats.push("Empty file".to_string());
    }

    ScanReport { safe: threats.is_empty(), threats }
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
