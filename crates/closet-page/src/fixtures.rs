//! Host-page fixtures shared by unit tests.

use closet_core::default_sites;

use crate::registry::PatternRegistry;

pub(crate) const AMAZON_URL: &str = "https://www.amazon.com/dp/B0HOODIE";

pub(crate) fn amazon_page(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Amazon.com</title></head><body>
<div id="dp">
  <div id="titleSection"><h1><span id="productTitle">
    {title}
  </span></h1></div>
  <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">List: $34.99 (save $5)</span></span></div>
  <div id="imageBlock">
    <div id="altImages"><ul class="a-unordered-list">
      <li class="imageThumbnail"><img src="https://m.media-amazon.com/images/I/t1.jpg"></li>
      <li class="imageThumbnail"><img src="https://m.media-amazon.com/images/I/t2.jpg"></li>
    </ul></div>
    <div id="main-image-container"><div id="imgTagWrapperId">
      <img id="landingImage" src="/images/I/main.jpg" alt="Product">
    </div></div>
  </div>
</div>
</body></html>"#
    )
}

pub(crate) fn amazon_hoodie() -> String {
    amazon_page("Men's Fleece Pullover Hoodie")
}

pub(crate) fn amazon_bottle() -> String {
    amazon_page("Stainless Steel Water Bottle, 32 oz")
}

pub(crate) const EBAY_URL: &str = "https://www.ebay.com/itm/1234567890";

/// eBay listing: no injection template and no thumbnail list.
pub(crate) const EBAY_JACKET: &str = r#"<html><body>
<div class="x-item-title"><h1 class="x-item-title__mainTitle"><span>Vintage Denim Jacket</span></h1></div>
<div class="x-price-primary"><span class="ux-textspans">US $45.00</span></div>
<div class="ux-image-carousel-item"><img src="https://i.ebayimg.com/images/g/jacket.jpg"></div>
</body></html>"#;

pub(crate) fn registry() -> PatternRegistry {
    PatternRegistry::compile(&default_sites().expect("embedded sites")).expect("compiles")
}
