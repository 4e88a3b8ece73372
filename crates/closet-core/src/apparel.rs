//! Apparel keyword list and title matching.

use crate::app_config::ApparelMatch;

/// Garment, footwear, accessory, and swimwear terms. Lowercase; matched
/// case-insensitively against product titles.
pub const APPAREL_KEYWORDS: &[&str] = &[
    // Tops
    "t-shirt", "tee", "shirt", "blouse", "tank", "tank top", "camisole", "crop top", "polo",
    "henley", "tunic", "sweatshirt", "hoodie", "sweater", "jumper", "cardigan", "pullover",
    "vest", "corset", "bodysuit", "tube top", "halter top",
    // Bottoms
    "jeans", "pants", "trousers", "slacks", "chinos", "cargo pants", "leggings", "joggers",
    "sweatpants", "shorts", "capris", "culottes", "skirt", "miniskirt", "maxi skirt",
    "midi skirt",
    // Dresses & Sets
    "dress", "gown", "maxi dress", "midi dress", "mini dress", "sundress", "jumpsuit", "romper",
    "playsuit", "co-ord", "two-piece set", "overalls", "dungarees", "unitard", "catsuit",
    // Outerwear
    "jacket", "coat", "overcoat", "trench coat", "blazer", "windbreaker", "parka", "puffer",
    "raincoat", "bomber", "leather jacket", "denim jacket", "fleece", "cape", "poncho", "gilet",
    // Footwear
    "shoes", "sneakers", "trainers", "boots", "ankle boots", "knee-high boots", "sandals",
    "heels", "pumps", "flats", "loafers", "oxfords", "slippers", "flip flops", "clogs", "mules",
    // Accessories
    "hat", "cap", "beanie", "scarf", "gloves", "belt", "tie", "necktie", "bow tie",
    "suspenders", "watch", "bracelet", "necklace", "earrings", "ring", "sunglasses", "glasses",
    "headband", "bandana",
    // Undergarments & Sleepwear
    "underwear", "bra", "panties", "briefs", "boxers", "boxer briefs", "lingerie", "sleepwear",
    "pajamas", "robe", "nightgown", "nightdress", "slip", "bralette", "loungewear", "thermal",
    "long johns",
    // Sportswear
    "activewear", "sportswear", "gym wear", "sports bra", "tracksuit", "running shorts",
    "yoga pants", "compression shirt", "jersey", "training top", "rash guard", "cycling shorts",
    // Kidswear
    "onesie", "baby suit", "kidswear", "toddler outfit", "school uniform", "baby shoes", "bibs",
    "mittens",
    // Traditional / Formalwear
    "suit", "tuxedo", "dress shirt", "kurta", "saree", "lehenga", "kimono", "hanbok",
    "cheongsam", "abaya", "kaftan", "thobe", "formal dress", "evening dress",
    // Swimwear
    "swimsuit", "bikini", "one-piece", "two-piece", "board shorts", "swim trunks", "rash vest",
    "cover-up", "sarong", "beachwear",
];

/// Returns the first apparel keyword found in `title`, if any.
#[must_use]
pub fn find_apparel_keyword(title: &str, mode: ApparelMatch) -> Option<&'static str> {
    let lower = title.to_lowercase();
    APPAREL_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| match mode {
            ApparelMatch::Substring => lower.contains(keyword),
            ApparelMatch::Word => contains_word(&lower, keyword),
        })
}

/// `true` when `needle` occurs in `haystack` with no alphanumeric character
/// directly before or after it.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut search_from = 0usize;
    while let Some(rel) = haystack[search_from..].find(needle) {
        let start = search_from + rel;
        let end = start + needle.len();
        let before_ok = !haystack[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric);
        let after_ok = !haystack[end..]
            .chars()
            .next()
            .is_some_and(char::is_alphanumeric);
        if before_ok && after_ok {
            return true;
        }
        // step one char forward; `start` is always a char boundary
        search_from = start
            + haystack[start..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
    }
    false
}
