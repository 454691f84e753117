//! Three-tier product card discovery.
//!
//! 1. Store selectors, most specific first; the first one matching at least
//!    `min_count` nodes wins.
//! 2. Links that wrap an image and whose href looks like a product page.
//! 3. Any image link with a long site-relative href.
//!
//! Tiers 2 and 3 only run when the store enables `link_fallback`.

use crate::browser::{Node, Session};

/// Href fragments that mark a product detail page.
const PRODUCT_HREF_MARKERS: &[&str] = &["/p", "/producto/", "/product/", "-p-"];

/// Shortest relative href accepted by the last-resort tier.
const MIN_FALLBACK_HREF_LEN: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct Cascade {
    pub primary: &'static [&'static str],
    pub min_count: usize,
    pub link_fallback: bool,
}

/// Which tier produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeTier {
    Primary(&'static str),
    ProductLinks,
    ImageLinks,
    Empty,
}

/// Runs `cascade` against the loaded page. Selector failures count as "no
/// match" and move on to the next tier.
pub async fn locate_candidates(
    session: &dyn Session,
    cascade: &Cascade,
) -> (Vec<Box<dyn Node>>, CascadeTier) {
    for &selector in cascade.primary {
        match session.query(selector).await {
            Ok(found) if found.len() >= cascade.min_count.max(1) => {
                return (found, CascadeTier::Primary(selector));
            }
            Ok(found) => {
                tracing::debug!(selector, count = found.len(), "selector below minimum");
            }
            Err(e) => tracing::debug!(selector, error = %e, "selector failed"),
        }
    }

    if !cascade.link_fallback {
        return (Vec::new(), CascadeTier::Empty);
    }

    let links = match session.query("a[href]").await {
        Ok(links) => links,
        Err(e) => {
            tracing::debug!(error = %e, "link scan failed");
            return (Vec::new(), CascadeTier::Empty);
        }
    };

    let mut product_links = Vec::new();
    let mut image_links = Vec::new();
    for link in links {
        let Some(shape) = classify_link(link.as_ref()).await else {
            continue;
        };
        match shape {
            LinkShape::Product => product_links.push(link),
            LinkShape::LongRelative => image_links.push(link),
        }
    }

    if !product_links.is_empty() {
        return (product_links, CascadeTier::ProductLinks);
    }
    if !image_links.is_empty() {
        return (image_links, CascadeTier::ImageLinks);
    }
    (Vec::new(), CascadeTier::Empty)
}

enum LinkShape {
    Product,
    LongRelative,
}

/// Shape of an image link, or `None` for links without an image or with an
/// unusable href. Node faults drop the link.
async fn classify_link(link: &dyn Node) -> Option<LinkShape> {
    let href = link.attribute("href").await.ok()??;
    let has_image = !link.query("img").await.ok()?.is_empty();
    if !has_image {
        return None;
    }
    if is_product_href(&href) {
        Some(LinkShape::Product)
    } else if href.starts_with('/') && href.len() >= MIN_FALLBACK_HREF_LEN {
        Some(LinkShape::LongRelative)
    } else {
        None
    }
}

fn is_product_href(href: &str) -> bool {
    PRODUCT_HREF_MARKERS.iter().any(|m| href.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::static_session;

    const CARDS: Cascade = Cascade {
        primary: &[".product-card", "[class*='galleryItem']"],
        min_count: 2,
        link_fallback: true,
    };

    async fn hrefs(nodes: &[Box<dyn Node>]) -> Vec<String> {
        let mut out = Vec::new();
        for node in nodes {
            out.push(node.attribute("href").await.unwrap().unwrap_or_default());
        }
        out
    }

    #[tokio::test]
    async fn first_selector_meeting_minimum_wins() {
        let session = static_session(
            r#"<div class="product-card"></div>
               <div class="galleryItem-a"></div>
               <div class="galleryItem-b"></div>"#,
        );
        let (nodes, tier) = locate_candidates(session.as_ref(), &CARDS).await;
        assert_eq!(tier, CascadeTier::Primary("[class*='galleryItem']"));
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_product_shaped_image_links() {
        let session = static_session(
            r#"<a href="/licuadora-oster/p"><img src="a.jpg"></a>
               <a href="/categoria/cocina/licuadoras"><img src="b.jpg"></a>
               <a href="/otra/p">sin imagen</a>"#,
        );
        let (nodes, tier) = locate_candidates(session.as_ref(), &CARDS).await;
        assert_eq!(tier, CascadeTier::ProductLinks);
        assert_eq!(hrefs(&nodes).await, ["/licuadora-oster/p"]);
    }

    #[tokio::test]
    async fn last_tier_takes_long_relative_image_links() {
        let session = static_session(
            r#"<a href="/categoria/cocina/licuadoras"><img src="b.jpg"></a>
               <a href="/corto"><img src="c.jpg"></a>
               <a href="https://elsewhere.test/categoria/larga"><img src="d.jpg"></a>"#,
        );
        let (nodes, tier) = locate_candidates(session.as_ref(), &CARDS).await;
        assert_eq!(tier, CascadeTier::ImageLinks);
        assert_eq!(hrefs(&nodes).await, ["/categoria/cocina/licuadoras"]);
    }

    #[tokio::test]
    async fn without_link_fallback_nothing_is_found() {
        let cascade = Cascade {
            link_fallback: false,
            ..CARDS
        };
        let session = static_session(r#"<a href="/licuadora/p"><img src="a.jpg"></a>"#);
        let (nodes, tier) = locate_candidates(session.as_ref(), &cascade).await;
        assert!(nodes.is_empty());
        assert_eq!(tier, CascadeTier::Empty);
    }

    #[tokio::test]
    async fn invalid_selector_moves_to_next_tier() {
        let cascade = Cascade {
            primary: &["div["],
            min_count: 1,
            link_fallback: true,
        };
        let session = static_session(r#"<a href="/x/producto/1"><img src="a.jpg"></a>"#);
        let (nodes, tier) = locate_candidates(session.as_ref(), &cascade).await;
        assert_eq!(tier, CascadeTier::ProductLinks);
        assert_eq!(nodes.len(), 1);
    }
}
