//! Gopher binary MIME guessing from item type and selector extension: the
//! item-type table is consulted first, then refined by file extension if
//! the selector has one.

pub fn guess_gopher_mime(gopher_type: char, selector: &str) -> String {
    let by_type = match gopher_type {
        '4' => "application/mac-binhex40",
        '5' => "application/zip",
        '6' => "application/x-uuencoded",
        '9' => "application/octet-stream",
        'g' => "image/gif",
        'I' => "image/jpeg",
        _ => "application/octet-stream",
    };

    if let Some(ext) = selector.rsplit('.').next().filter(|e| *e != selector) {
        if let Some(mime) = by_extension(&ext.to_lowercase()) {
            return mime.to_string();
        }
    }

    by_type.to_string()
}

fn by_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => return None,
    })
}
