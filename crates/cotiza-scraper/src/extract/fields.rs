//! Per-card field chains: link, name, price and image.

use url::Url;

use crate::browser::Node;
use crate::error::ScraperError;
use crate::price::find_price;
use crate::text::first_substantial_line;

/// Shortest raw href considered a real link.
const MIN_HREF_LEN: usize = 5;

const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

/// Resolves a raw href against the store base URL.
///
/// Empty hrefs, `#`, and anything shorter than five characters are rejected,
/// as are hrefs that do not form a valid URL.
#[must_use]
pub fn resolve_href(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "#" || raw.len() < MIN_HREF_LEN {
        return None;
    }
    base.join(raw).ok().map(String::from)
}

/// The card's own `href`, else its first link descendant's, resolved to an
/// absolute URL.
///
/// # Errors
///
/// Propagates node access failures.
pub async fn link_href(node: &dyn Node, base: &Url) -> Result<Option<String>, ScraperError> {
    if let Some(own) = node.attribute("href").await? {
        return Ok(resolve_href(base, &own));
    }
    let Some(link) = node.query("a[href]").await?.into_iter().next() else {
        return Ok(None);
    };
    Ok(link
        .attribute("href")
        .await?
        .and_then(|href| resolve_href(base, &href)))
}

/// One step of a name fallback chain.
#[derive(Debug, Clone, Copy)]
pub enum NameSource {
    /// Text of the first descendant matching the selector.
    Selector(&'static str),
    /// An attribute on the card itself, e.g. `title` or `aria-label`.
    Attribute(&'static str),
    /// `alt` of the first image descendant.
    ImageAlt,
    /// First line of the card text long enough to be a title.
    FirstLine,
}

/// Walks `chain` and returns the first candidate longer than `min_chars`.
///
/// # Errors
///
/// Propagates node access failures.
pub async fn first_name(
    node: &dyn Node,
    chain: &[NameSource],
    min_chars: usize,
) -> Result<Option<String>, ScraperError> {
    for source in chain {
        let candidate = match *source {
            NameSource::Selector(selector) => match node.query(selector).await?.first() {
                Some(found) => Some(found.text().await?),
                None => None,
            },
            NameSource::Attribute(name) => node.attribute(name).await?,
            NameSource::ImageAlt => match node.query("img").await?.first() {
                Some(img) => img.attribute("alt").await?,
                None => None,
            },
            NameSource::FirstLine => {
                let text = node.text().await?;
                first_substantial_line(&text, min_chars).map(str::to_string)
            }
        };

        if let Some(name) = candidate {
            let name = name.trim();
            if name.chars().count() > min_chars {
                return Ok(Some(name.to_string()));
            }
        }
    }
    Ok(None)
}

/// Raw price text for a card.
///
/// The first `selectors` match whose text carries a currency token is
/// returned whole, so a block holding both the list and the sale price keeps
/// both. Otherwise the first token in the card text, then in up to
/// `ancestor_levels` ancestors, is used. Empty when nothing matched.
///
/// # Errors
///
/// Propagates node access failures.
pub async fn price_text(
    node: &dyn Node,
    selectors: &[&str],
    ancestor_levels: usize,
) -> Result<String, ScraperError> {
    for selector in selectors {
        if let Some(found) = node.query(selector).await?.first() {
            let text = found.text().await?;
            if find_price(&text).is_some() {
                return Ok(text.trim().to_string());
            }
        }
    }

    let own = node.text().await?;
    if let Some(token) = find_price(&own) {
        return Ok(token.to_string());
    }

    if ancestor_levels > 0 {
        for text in node.ancestor_texts(ancestor_levels).await? {
            if let Some(token) = find_price(&text) {
                return Ok(token.to_string());
            }
        }
    }
    Ok(String::new())
}

/// Image source of the card's first image, trying lazy-load attributes
/// after `src`. Empty when the card has no usable image.
///
/// # Errors
///
/// Propagates node access failures.
pub async fn image_src(node: &dyn Node) -> Result<String, ScraperError> {
    let Some(img) = node.query("img").await?.into_iter().next() else {
        return Ok(String::new());
    };
    for attr in IMAGE_ATTRS {
        if let Some(value) = img.attribute(attr).await? {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::static_session;

    fn base() -> Url {
        Url::parse("https://www.tienda.test").unwrap()
    }

    async fn first(html: &str, selector: &str) -> Box<dyn Node> {
        let session = static_session(html);
        session
            .query(selector)
            .await
            .unwrap()
            .into_iter()
            .next()
            .expect("node present")
    }

    // -----------------------------------------------------------------------
    // resolve_href / link_href
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_href_makes_relative_links_absolute() {
        assert_eq!(
            resolve_href(&base(), "/licuadora/p").as_deref(),
            Some("https://www.tienda.test/licuadora/p")
        );
        assert_eq!(
            resolve_href(&base(), "https://cdn.test/x/p").as_deref(),
            Some("https://cdn.test/x/p")
        );
    }

    #[test]
    fn resolve_href_rejects_placeholders() {
        for raw in ["", "   ", "#", "/p", "/a/"] {
            assert_eq!(resolve_href(&base(), raw), None, "{raw:?}");
        }
    }

    #[tokio::test]
    async fn link_href_prefers_own_attribute() {
        let node = first(r#"<a href="/uno/p"><a href="/dos/p"></a></a>"#, "a").await;
        assert_eq!(
            link_href(node.as_ref(), &base()).await.unwrap().as_deref(),
            Some("https://www.tienda.test/uno/p")
        );
    }

    #[tokio::test]
    async fn link_href_uses_first_descendant_link() {
        let node = first(
            r#"<div class="card"><span>x</span><a href="/dos/p">Dos</a><a href="/tres/p">Tres</a></div>"#,
            "div.card",
        )
        .await;
        assert_eq!(
            link_href(node.as_ref(), &base()).await.unwrap().as_deref(),
            Some("https://www.tienda.test/dos/p")
        );

        let bare = first(r#"<div class="card">sin enlace</div>"#, "div.card").await;
        assert_eq!(link_href(bare.as_ref(), &base()).await.unwrap(), None);
    }

    // -----------------------------------------------------------------------
    // first_name
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn first_name_skips_short_candidates() {
        let node = first(
            r#"<div class="card" aria-label="Licuadora Oster 10 velocidades">
                 <h3>Oster</h3>
                 <img alt="Foto">
               </div>"#,
            "div.card",
        )
        .await;
        let chain = [
            NameSource::Selector("h3"),
            NameSource::ImageAlt,
            NameSource::Attribute("aria-label"),
        ];
        assert_eq!(
            first_name(node.as_ref(), &chain, 5).await.unwrap().as_deref(),
            Some("Licuadora Oster 10 velocidades")
        );
    }

    #[tokio::test]
    async fn first_name_falls_back_to_first_long_line() {
        let node = first(
            r#"<div class="card"><p>Nuevo</p><p>Cafetera Black+Decker 12 tazas</p><p>$29.99</p></div>"#,
            "div.card",
        )
        .await;
        let chain = [NameSource::Selector(".missing"), NameSource::FirstLine];
        assert_eq!(
            first_name(node.as_ref(), &chain, 5).await.unwrap().as_deref(),
            Some("Cafetera Black+Decker 12 tazas")
        );
        assert_eq!(
            first_name(node.as_ref(), &[NameSource::Selector(".missing")], 5)
                .await
                .unwrap(),
            None
        );
    }

    // -----------------------------------------------------------------------
    // price_text
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn price_text_returns_whole_selector_block() {
        let node = first(
            r#"<div class="card"><div class="price">Antes $59.99 Ahora $49.99</div></div>"#,
            "div.card",
        )
        .await;
        assert_eq!(
            price_text(node.as_ref(), &[".price"], 0).await.unwrap(),
            "Antes $59.99 Ahora $49.99"
        );
    }

    #[tokio::test]
    async fn price_text_skips_selector_without_currency() {
        let node = first(
            r#"<div class="card"><span class="price">Consultar</span><p>Oferta $12.50</p></div>"#,
            "div.card",
        )
        .await;
        assert_eq!(price_text(node.as_ref(), &[".price"], 0).await.unwrap(), "$12.50");
    }

    #[tokio::test]
    async fn price_text_reads_ancestors() {
        let html = r#"<div class="tile"><a href="/camisa/p"><img src="c.jpg"></a><span>$15.00</span></div>"#;
        let link = first(html, "a").await;
        assert_eq!(price_text(link.as_ref(), &[], 0).await.unwrap(), "");
        assert_eq!(price_text(link.as_ref(), &[], 3).await.unwrap(), "$15.00");
    }

    // -----------------------------------------------------------------------
    // image_src
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn image_src_tries_lazy_attributes() {
        let node = first(
            r#"<div class="card"><img src="" data-src="/lazy.jpg"></div>"#,
            "div.card",
        )
        .await;
        assert_eq!(image_src(node.as_ref()).await.unwrap(), "/lazy.jpg");

        let none = first(r#"<div class="card"></div>"#, "div.card").await;
        assert_eq!(image_src(none.as_ref()).await.unwrap(), "");
    }
}
