//! Page aggregation: stitch several listing pages into one bounded result.

use std::future::Future;

use tracing::{debug, instrument};

use shopline_shared::{Page, Result, ResultExt, ShoplineError};

/// Fetch pages starting at `start_page` until `limit` items are collected or
/// the upstream runs out.
///
/// `page_size_hint` of 0, or anything above `limit`, is clamped to `limit`
/// so no request asks for more than the caller will keep. The result carries
/// the first page's `total_count` and `pagination`; `has_more` is forced to
/// `true` when items were cut off by `limit`.
///
/// Stops early on `has_more = false` or on an empty page (an upstream that
/// claims more data but returns none would otherwise loop forever). The first
/// fetch error is returned as-is.
#[instrument(skip_all, fields(start_page = start_page, limit = limit))]
pub async fn aggregate<T, F, Fut>(
    start_page: u32,
    page_size_hint: u32,
    limit: usize,
    mut fetch_page: F,
) -> Result<Page<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    if limit == 0 {
        return Err(ShoplineError::validation(
            "limit must be > 0 for multi-page listing",
        ));
    }

    let limit_u32 = u32::try_from(limit).unwrap_or(u32::MAX);
    let page_size = if page_size_hint == 0 || page_size_hint > limit_u32 {
        limit_u32
    } else {
        page_size_hint
    };
    let start_page = start_page.max(1);

    let mut result = Page {
        page: start_page,
        page_size,
        ..Page::default()
    };
    let mut current_page = start_page;
    let mut pages_fetched = 0usize;

    loop {
        let Page {
            items,
            pagination,
            total_count,
            has_more,
            ..
        } = fetch_page(current_page, page_size).await?;
        pages_fetched += 1;

        if pages_fetched == 1 {
            result.total_count = total_count;
            result.pagination = pagination;
        }

        let received = items.len();
        result.items.extend(items);
        result.has_more = has_more;

        debug!(
            page = current_page,
            received,
            collected = result.items.len(),
            has_more,
            "fetched listing page"
        );

        if !has_more || received == 0 || result.items.len() >= limit {
            break;
        }
        current_page += 1;
    }

    if result.items.len() > limit {
        result.items.truncate(limit);
        result.has_more = true;
    }

    debug!(
        pages_fetched,
        items = result.items.len(),
        total_count = result.total_count,
        has_more = result.has_more,
        "listing aggregated"
    );

    Ok(result)
}

/// List a resource the way list commands do: a single request when
/// `limit == 0`, otherwise [`aggregate`] from `page`.
///
/// Errors from either path are wrapped with `context`
/// (e.g. `"failed to list orders"`).
pub async fn fetch_list<T, S, SFut, F, FFut>(
    limit: usize,
    page: u32,
    page_size: u32,
    fetch_single: S,
    fetch_paged: F,
    context: &str,
) -> Result<Page<T>>
where
    S: FnOnce() -> SFut,
    SFut: Future<Output = Result<Page<T>>>,
    F: FnMut(u32, u32) -> FFut,
    FFut: Future<Output = Result<Page<T>>>,
{
    if limit == 0 {
        return fetch_single().await.context(context);
    }
    aggregate(page, page_size, limit, fetch_paged)
        .await
        .context(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopline_shared::Pagination;
    use std::future::ready;

    fn page(items: &[i32], total: u64, has_more: bool) -> Page<i32> {
        Page {
            items: items.to_vec(),
            total_count: total,
            has_more,
            ..Page::default()
        }
    }

    #[tokio::test]
    async fn respects_limit_and_truncates() {
        let mut calls = 0;
        let result = aggregate(1, 2, 5, |page_no, page_size| {
            calls += 1;
            assert_eq!(page_size, 2);
            let mut p = match page_no {
                1 => page(&[1, 2], 7, true),
                2 => page(&[3, 4], 7, true),
                3 => page(&[5, 6], 7, true),
                other => panic!("unexpected page {other}"),
            };
            p.pagination = Pagination {
                current_page: page_no,
                per_page: 2,
                total_count: 7,
                total_pages: 4,
            };
            ready(Ok(p))
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(result.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(result.total_count, 7);
        assert!(result.has_more, "trimmed to limit must report more");
        assert_eq!(result.pagination.current_page, 1);
        assert_eq!(result.pagination.total_pages, 4);
    }

    #[tokio::test]
    async fn stops_when_upstream_has_no_more() {
        let mut calls = 0;
        let result = aggregate(1, 3, 10, |page_no, _| {
            calls += 1;
            ready(Ok(match page_no {
                1 => page(&[1, 2], 3, true),
                2 => page(&[3], 3, false),
                other => panic!("unexpected page {other}"),
            }))
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(result.items, vec![1, 2, 3]);
        assert_eq!(result.total_count, 3);
        assert!(!result.has_more);
    }

    #[tokio::test]
    async fn exact_fit_on_terminal_page_keeps_has_more_false() {
        let result = aggregate(1, 2, 4, |page_no, _| {
            ready(Ok(match page_no {
                1 => page(&[1, 2], 4, true),
                2 => page(&[3, 4], 4, false),
                other => panic!("unexpected page {other}"),
            }))
        })
        .await
        .unwrap();

        assert_eq!(result.items, vec![1, 2, 3, 4]);
        assert!(!result.has_more);
    }

    #[tokio::test]
    async fn caps_an_endless_upstream() {
        let mut calls = 0;
        let result = aggregate(1, 3, 7, |page_no, page_size| {
            calls += 1;
            let start = (page_no as i32 - 1) * page_size as i32;
            let items: Vec<i32> = (start..start + page_size as i32).collect();
            ready(Ok(page(&items, 1_000_000, true)))
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(result.items, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(result.has_more);
        assert_eq!(result.total_count, 1_000_000);
    }

    #[tokio::test]
    async fn empty_page_stops_even_if_upstream_claims_more() {
        let mut calls = 0;
        let result = aggregate(1, 2, 10, |page_no, _| {
            calls += 1;
            ready(Ok(match page_no {
                1 => page(&[1, 2], 50, true),
                _ => page(&[], 50, true),
            }))
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(result.items, vec![1, 2]);
    }

    #[tokio::test]
    async fn page_size_is_clamped_to_limit() {
        for hint in [0, 100] {
            let mut seen = Vec::new();
            aggregate(1, hint, 5, |_, page_size| {
                seen.push(page_size);
                ready(Ok(page(&[1], 1, false)))
            })
            .await
            .unwrap();
            assert_eq!(seen, vec![5], "hint {hint}");
        }
    }

    #[tokio::test]
    async fn starts_at_requested_page_and_keeps_first_page_metadata() {
        let mut pages = Vec::new();
        let result = aggregate(3, 1, 2, |page_no, _| {
            pages.push(page_no);
            ready(Ok(match page_no {
                3 => page(&[30], 10, true),
                4 => page(&[40], 99, true),
                other => panic!("unexpected page {other}"),
            }))
        })
        .await
        .unwrap();

        assert_eq!(pages, vec![3, 4]);
        assert_eq!(result.items, vec![30, 40]);
        assert_eq!(result.total_count, 10);
        assert_eq!(result.page, 3);
    }

    #[tokio::test]
    async fn fetch_error_aborts_without_partial_result() {
        let mut calls = 0;
        let err = aggregate(1, 2, 10, |page_no, _| {
            calls += 1;
            ready(match page_no {
                1 => Ok(page(&[1, 2], 10, true)),
                _ => Err(ShoplineError::Api {
                    status: 500,
                    message: "boom".into(),
                }),
            })
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 2);
        assert!(matches!(err, ShoplineError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let err = aggregate(1, 2, 0, |_, _| ready(Ok(page(&[1], 1, false))))
            .await
            .unwrap_err();
        assert!(matches!(err, ShoplineError::Validation { .. }));
    }

    #[tokio::test]
    async fn fetch_list_single_request_when_limit_zero() {
        let mut single_calls = 0;
        let mut paged_calls = 0;
        let result = fetch_list(
            0,
            1,
            20,
            || {
                single_calls += 1;
                ready(Ok(page(&[1, 2], 2, false)))
            },
            |_, _| {
                paged_calls += 1;
                ready(Err(ShoplineError::validation("should not page")))
            },
            "failed to list",
        )
        .await
        .unwrap();

        assert_eq!((single_calls, paged_calls), (1, 0));
        assert_eq!(result.items, vec![1, 2]);
    }

    #[tokio::test]
    async fn fetch_list_pages_when_limit_set() {
        let mut single_calls = 0;
        let mut paged_calls = 0;
        let result = fetch_list(
            3,
            1,
            2,
            || {
                single_calls += 1;
                ready(Err(ShoplineError::validation("should not single fetch")))
            },
            |page_no, _| {
                paged_calls += 1;
                ready(Ok(match page_no {
                    1 => page(&[1, 2], 3, true),
                    2 => page(&[3], 3, false),
                    other => panic!("unexpected page {other}"),
                }))
            },
            "failed to list",
        )
        .await
        .unwrap();

        assert_eq!((single_calls, paged_calls), (0, 2));
        assert_eq!(result.items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn fetch_list_wraps_errors_with_context() {
        for limit in [0, 2] {
            let err = fetch_list::<i32, _, _, _, _>(
                limit,
                1,
                20,
                || ready(Err(ShoplineError::Network("single fail".into()))),
                |_, _| ready(Err(ShoplineError::Network("paged fail".into()))),
                "failed to list widgets",
            )
            .await
            .unwrap_err();

            assert!(err.to_string().starts_with("failed to list widgets: "));
            assert!(matches!(err.root(), ShoplineError::Network(_)));
        }
    }
}
