use std::ops::Range;

use crate::{
    bson_util::array_entry_size_bytes,
    bulk::WriteRequest,
    coll::options::BatchLimits,
    error::Result,
};

// Returns how many leading elements of `all` fit in a single batch of at most `max_count`
// elements whose sizes sum to at most `max_batch_size`. A non-empty `all` always yields at least
// one element, even if that element alone is too large.
pub(crate) fn batch_len<T>(
    all: &[T],
    max_count: usize,
    max_batch_size: usize,
    get_size: impl Fn(usize, &T) -> Result<usize>,
) -> Result<usize> {
    if all.is_empty() {
        return Ok(0);
    }

    let mut batch_size = get_size(0, &all[0])?;

    for (i, elem) in all.iter().enumerate().skip(1) {
        if i >= max_count {
            return Ok(i);
        }

        let elem_size = get_size(i, elem)?;

        if batch_size + elem_size > max_batch_size {
            return Ok(i);
        }

        batch_size += elem_size;
    }

    Ok(all.len())
}

/// Splits `requests` into contiguous sub-batches that respect `limits`. Each range is the
/// position of a sub-batch in `requests`.
pub(crate) fn split_into_batches(
    requests: &[WriteRequest],
    limits: &BatchLimits,
) -> Result<Vec<Range<usize>>> {
    let mut batches = Vec::new();
    let mut offset = 0;

    while offset < requests.len() {
        let len = batch_len(
            &requests[offset..],
            limits.max_write_batch_size,
            limits.max_message_size_bytes,
            |index, request| Ok(array_entry_size_bytes(index, request.size_bytes()?)),
        )?;
        batches.push(offset..offset + len);
        offset += len;
    }

    Ok(batches)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{batch_len, split_into_batches};
    use crate::{
        bson::doc,
        bulk::WriteRequest,
        coll::options::{BatchLimits, CollectionOptions},
    };

    #[test]
    fn split_empty_batch() {
        let all: Vec<i32> = Vec::new();

        assert_eq!(batch_len(&all, 10, 10, |_, _| Ok(1)).unwrap(), 0);
    }

    #[test]
    fn split_single_batch() {
        let all = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        assert_eq!(batch_len(&all, 100, 10, |_, _| Ok(1)).unwrap(), 10);
    }

    #[test]
    fn split_multi_batch() {
        let all = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        assert_eq!(batch_len(&all, 100, 3, |_, _| Ok(1)).unwrap(), 3);
        assert_eq!(batch_len(&all, 4, 100, |_, _| Ok(1)).unwrap(), 4);
    }

    #[test]
    fn split_batch_with_too_large_element() {
        let all = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        assert_eq!(batch_len(&all, 100, 3, |_, _| Ok(5)).unwrap(), 1);
    }

    #[test]
    fn split_requests_until_empty() {
        let requests: Vec<WriteRequest> = (0..10)
            .map(|i| WriteRequest::InsertOne {
                document: doc! { "_id": i },
            })
            .collect();
        let limits = BatchLimits::from_options(
            &CollectionOptions::builder().max_write_batch_size(3).build(),
        );

        let batches = split_into_batches(&requests, &limits).unwrap();

        assert_eq!(batches, vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn split_large_documents_by_message_size() {
        let data = "a".repeat(15 * 1024 * 1024);
        let requests: Vec<WriteRequest> = (0..4)
            .map(|i| WriteRequest::InsertOne {
                document: doc! { "_id": i, "data": data.clone() },
            })
            .collect();
        let limits = BatchLimits::from_options(
            &CollectionOptions::builder()
                .max_bson_object_size(16 * 1024 * 1024)
                .build(),
        );

        let batches = split_into_batches(&requests, &limits).unwrap();

        assert_eq!(batches, vec![0..3, 3..4]);
    }
}
