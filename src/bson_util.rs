use crate::{
    bson::{doc, Bson, Document},
    error::{Error, Result},
    id::IdGenerator,
};

pub(crate) fn first_key(document: &Document) -> Option<&str> {
    document.keys().next().map(String::as_str)
}

/// Returns the `_id` of the given document, prepending a freshly generated one if it does not
/// have one or its `_id` is null. The document is modified in place.
pub(crate) fn get_or_prepend_id_field(
    document: &mut Document,
    generator: &dyn IdGenerator,
) -> Bson {
    match document.get("_id") {
        None | Some(Bson::Null) => {}
        Some(id) => return id.clone(),
    }

    let id = generator.next_id();
    let mut with_id = doc! { "_id": id.clone() };
    document.remove("_id");
    for (key, value) in std::mem::take(document) {
        with_id.insert(key, value);
    }
    *document = with_id;
    id
}

/// If the filter selects a single document by exact `_id` equality, returns that `_id`.
pub(crate) fn exact_id_match(filter: &Document) -> Option<&Bson> {
    if filter.len() != 1 {
        return None;
    }
    match filter.get("_id") {
        Some(Bson::Document(operators)) if first_key(operators).is_some_and(is_operator) => None,
        Some(Bson::RegularExpression(_)) => None,
        other => other,
    }
}

fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}

pub(crate) fn replacement_document_check(replacement: &Document) -> Result<()> {
    match replacement.keys().find(|key| is_operator(key)) {
        Some(key) => Err(Error::invalid_argument(format!(
            "replacement document must not contain update operators, but found key \"{key}\""
        ))),
        None => Ok(()),
    }
}

pub(crate) fn update_document_check(update: &Document) -> Result<()> {
    match first_key(update) {
        Some(s) if is_operator(s) => Ok(()),
        _ => Err(Error::invalid_argument(
            "update document must have first key starting with '$'",
        )),
    }
}

/// The size of the given document when serialized as BSON.
pub(crate) fn document_size_bytes(document: &Document) -> Result<usize> {
    Ok(crate::bson::to_vec(document)?.len())
}

/// The size in bytes of the provided document's entry in a BSON array at the given index.
pub(crate) fn array_entry_size_bytes(index: usize, doc_len: usize) -> usize {
    //   * type (1 byte)
    //   * number of decimal digits in key
    //   * null terminator for the key (1 byte)
    //   * size of value

    1 + num_decimal_digits(index) + 1 + doc_len
}

/// The number of digits in `n` in base 10.
/// Useful for calculating the size of an array entry in BSON.
fn num_decimal_digits(mut n: usize) -> usize {
    let mut digits = 0;

    loop {
        n /= 10;
        digits += 1;

        if n == 0 {
            return digits;
        }
    }
}
