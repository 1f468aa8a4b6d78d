use serde::Serialize;
use serde_json::Value;

pub const PAGE_SIZE: usize = 50;

/// Page navigation for a paginated list. `prev` and `next` are left out at
/// the boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pager {
    pub url: String,
    pub curr: usize,
    pub last: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<usize>,
}

/// Slice a `{count, objects}` envelope in place to the requested page.
///
/// A missing or non-integer page is page 1; anything outside `1..=last` is the
/// last page. Envelopes that fit on one page are left untouched and get no
/// pager.
pub fn paginate(
    envelope: &mut Value,
    page: Option<&str>,
    page_size: usize,
    url: &str,
) -> Option<Pager> {
    let page_size = page_size.max(1);
    let objects = envelope.get_mut("objects")?.as_array_mut()?;
    let count = objects.len();
    if count <= page_size {
        return None;
    }

    let last = count.div_ceil(page_size);
    let curr = match page.map(str::trim) {
        None => 1,
        Some(p) => match p.parse::<i64>() {
            Ok(n) if n < 1 || n as usize > last => last,
            Ok(n) => n as usize,
            // Integers past i64 are still out of range.
            Err(_) if is_integer(p) => last,
            Err(_) => 1,
        },
    };

    let start = (curr - 1) * page_size;
    let end = (start + page_size).min(count);
    let page_items: Vec<Value> = objects.drain(start..end).collect();
    *objects = page_items;

    Some(Pager {
        url: url.to_string(),
        curr,
        last,
        prev: (curr > 1).then(|| curr - 1),
        next: (curr < last).then(|| curr + 1),
    })
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(n: usize) -> Value {
        let objects: Vec<Value> = (1..=n).map(|i| json!(i)).collect();
        json!({ "count": n, "objects": objects })
    }

    fn ids(env: &Value) -> Vec<u64> {
        env["objects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap())
            .collect()
    }

    #[test]
    fn first_page_has_next_only() {
        let mut env = envelope(120);
        let pager = paginate(&mut env, Some("1"), PAGE_SIZE, "/api/x/").unwrap();
        assert_eq!(ids(&env), (1..=50).collect::<Vec<_>>());
        assert_eq!((pager.curr, pager.last, pager.prev, pager.next), (1, 3, None, Some(2)));
        assert_eq!(
            serde_json::to_value(&pager).unwrap(),
            json!({"url": "/api/x/", "curr": 1, "last": 3, "next": 2})
        );
    }

    #[test]
    fn middle_page_has_both() {
        let mut env = envelope(120);
        let pager = paginate(&mut env, Some("2"), PAGE_SIZE, "").unwrap();
        assert_eq!(ids(&env), (51..=100).collect::<Vec<_>>());
        assert_eq!((pager.prev, pager.next), (Some(1), Some(3)));
    }

    #[test]
    fn last_page_has_prev_only() {
        let mut env = envelope(120);
        let pager = paginate(&mut env, Some("3"), PAGE_SIZE, "").unwrap();
        assert_eq!(ids(&env), (101..=120).collect::<Vec<_>>());
        assert_eq!((pager.prev, pager.next), (Some(2), None));
        let json = serde_json::to_value(&pager).unwrap();
        assert!(json.get("next").is_none());
    }

    #[test]
    fn non_integer_page_is_first() {
        let mut env = envelope(120);
        let pager = paginate(&mut env, Some("abc"), PAGE_SIZE, "").unwrap();
        assert_eq!(pager.curr, 1);

        for page in ["", "+", "1.5", "12abc"] {
            let mut env = envelope(120);
            assert_eq!(paginate(&mut env, Some(page), PAGE_SIZE, "").unwrap().curr, 1, "page {page:?}");
        }

        let mut env = envelope(120);
        assert_eq!(paginate(&mut env, None, PAGE_SIZE, "").unwrap().curr, 1);
    }

    #[test]
    fn out_of_range_page_is_last() {
        for page in ["999", "0", "-4", "99999999999999999999", "-99999999999999999999"] {
            let mut env = envelope(120);
            let pager = paginate(&mut env, Some(page), PAGE_SIZE, "").unwrap();
            assert_eq!(pager.curr, 3, "page {page}");
            assert_eq!(ids(&env).len(), 20);
        }
    }

    #[test]
    fn small_lists_are_untouched() {
        let mut env = envelope(50);
        assert!(paginate(&mut env, Some("2"), PAGE_SIZE, "").is_none());
        assert_eq!(ids(&env).len(), 50);
    }
}
