//! Reply composition: opening line, intent body, fallbacks, closing and suggestions

use crate::ranking::ProductRanker;
use crate::session::SessionContext;
use crate::types::*;
use std::sync::Arc;
use tracing::debug;

pub const MAX_PICKS: usize = 3;
pub const MAX_LISTED: usize = 8;
pub const MAX_SANITIZED_CHARS: usize = 400;
const MIN_OPENING_CHARS: usize = 3;

const REPLACEMENTS: &[(&str, &str)] = &[
    ("هل لديك أي مشكلة", "تبغى أساعدك بحل أي مشكلة؟"),
    ("هل تحتاج مزيد من المعلومات", "تحب أوضح لك شي معين؟"),
    ("قيمة أكبر", "أفضل قيمة مقابل السعر"),
];

/// Apply phrase replacements, then cut long texts back to the last full sentence
pub fn sanitize_response(text: &str) -> String {
    let mut text = text.to_string();
    for (bad, good) in REPLACEMENTS {
        text = text.replace(bad, good);
    }

    if text.chars().count() <= MAX_SANITIZED_CHARS {
        return text;
    }

    let head: String = text.chars().take(MAX_SANITIZED_CHARS).collect();
    let kept = match head.rfind(". ") {
        Some(idx) => &head[..idx],
        None => head.as_str(),
    };
    format!("{}...", kept)
}

/// Price as shown to the customer
pub fn price_text(product: &Product, lang: Lang) -> String {
    match (product.discounted_price(), product.price, lang) {
        (Some(discounted), Some(list), Lang::Ar) => format!("{}$ (خصم من {}$)", discounted, list),
        (Some(discounted), Some(list), Lang::En) => format!("{}$ (off {}$)", discounted, list),
        (None, Some(list), _) => format!("{}$", list),
        (_, _, Lang::Ar) => "غير متاح".to_string(),
        (_, _, Lang::En) => "unavailable".to_string(),
    }
}

fn fallback_greeting(lang: Lang) -> &'static str {
    match lang {
        Lang::Ar => "هلا! جاهز أساعدك بأفضل المنتجات.",
        Lang::En => "Hi! Ready to help you find the best products.",
    }
}

/// Fixed closing question per intent and language
pub fn closing(intent: Intent, lang: Lang) -> &'static str {
    match lang {
        Lang::Ar => match intent {
            Intent::Browse => "تحب نركّز على المواصفات، السعر، ولا شي ثاني؟",
            Intent::Deals => "تبغى عروض أكثر ولا نختار فئة معينة؟",
            Intent::Prices => "وش ميزانيتك بالضبط عشان أرشح لك الأفضل؟",
            Intent::Categories => "تبغى أرشح لك منتجات من تصنيف معين؟",
            Intent::Brands => "أي ماركة تفضّل نشوف منتجاتها؟",
            Intent::Complaint => "قلّي وش المشكلة وأحلها لك بسرعة!",
            Intent::Compare => "أي منتجين تبغى نقارن بينهم؟",
            Intent::Info => "وش تبغى نشوف لك الحين؟",
        },
        Lang::En => match intent {
            Intent::Browse => "Should we focus on specs, price, or something else?",
            Intent::Deals => "Want more deals, or should we pick a category?",
            Intent::Prices => "What's your exact budget so I can recommend the best?",
            Intent::Categories => "Want me to recommend products from a specific category?",
            Intent::Brands => "Which brand would you like to see?",
            Intent::Complaint => "Tell me what went wrong and I'll fix it quickly!",
            Intent::Compare => "Which two products should we compare?",
            Intent::Info => "What would you like to see now?",
        },
    }
}

struct Phrases {
    best_options: &'static str,
    no_results: &'static str,
    nothing_available: &'static str,
    categories: &'static str,
    brands: &'static str,
    none_listed: &'static str,
    compare_prompt: &'static str,
    compare_by_name: &'static str,
    complaint: &'static str,
    price_label: &'static str,
}

const AR: Phrases = Phrases {
    best_options: "إليك أفضل الخيارات:",
    no_results: "ما لقيت منتجات تطابق طلبك بالضبط، بس هذي خيارات ممكن تعجبك:",
    nothing_available: "ما لقيت منتجات تطابق طلبك حالياً.",
    categories: "التصنيفات المتاحة: ",
    brands: "الماركات عندنا: ",
    none_listed: "ما عندي قائمة متاحة حالياً.",
    compare_prompt: "اكتب أرقام المنتجات اللي تبغى تقارن بينها (مثلاً: 1 و 2):",
    compare_by_name: "قولي أسماء المنتجات اللي تبغى تقارن بينها.",
    complaint: "آسفين على أي إزعاج! قولي وش المشكلة بالضبط وأضبّطها لك فوراً.",
    price_label: " — السعر: ",
};

const EN: Phrases = Phrases {
    best_options: "Here are the best options:",
    no_results: "I couldn't find an exact match, but these might interest you:",
    nothing_available: "I couldn't find any matching products right now.",
    categories: "Available categories: ",
    brands: "Our brands: ",
    none_listed: "Nothing is listed right now.",
    compare_prompt: "Reply with the numbers of the products to compare (e.g. 1 and 2):",
    compare_by_name: "Tell me the names of the products you want to compare.",
    complaint: "Sorry for any inconvenience! Tell me exactly what went wrong and I'll sort it out right away.",
    price_label: " - price: ",
};

fn phrases(lang: Lang) -> &'static Phrases {
    match lang {
        Lang::Ar => &AR,
        Lang::En => &EN,
    }
}

/// Everything the composer needs for one turn
pub struct ComposeRequest<'a> {
    pub opening: &'a str,
    pub intent: Intent,
    pub preferences: &'a Preferences,
    pub candidates: &'a [Product],  // ranked, best first
    pub snapshot: &'a CatalogSnapshot,
    pub lang: Lang,
}

#[derive(Debug, Clone)]
pub struct ComposedReply {
    pub text: String,
    /// Products the reply refers to: the ranked candidates, or the fallback picks
    pub products: Vec<Product>,
    pub used_fallback: bool,
}

pub struct ReplyComposer {
    ranker: Arc<ProductRanker>,
}

impl ReplyComposer {
    pub fn new(ranker: Arc<ProductRanker>) -> Self {
        Self { ranker }
    }

    pub fn compose(&self, req: &ComposeRequest<'_>) -> ComposedReply {
        let text = phrases(req.lang);
        let mut lines = vec![opening_line(req.opening, req.lang)];
        let mut products = Vec::new();
        let mut used_fallback = false;

        match req.intent {
            intent if intent.shows_products() => {
                if !req.candidates.is_empty() {
                    lines.push(text.best_options.to_string());
                    lines.extend(numbered(req.candidates, MAX_PICKS, req.lang));
                    products = req.candidates.to_vec();
                } else {
                    used_fallback = true;
                    products = self.fallback(intent, req.snapshot);
                    debug!("No candidates for {}, {} fallback products", intent, products.len());
                    if products.is_empty() {
                        lines.push(text.nothing_available.to_string());
                    } else {
                        lines.push(text.no_results.to_string());
                        lines.extend(numbered(&products, MAX_PICKS, req.lang));
                    }
                }
            }
            Intent::Categories => {
                let names: Vec<&str> = req.snapshot.categories.iter().take(MAX_LISTED).map(|c| c.name.as_str()).collect();
                lines.push(listing(text.categories, &names, text.none_listed));
            }
            Intent::Brands => {
                let names: Vec<&str> = req.snapshot.brands.iter().take(MAX_LISTED).map(|b| b.name.as_str()).collect();
                lines.push(listing(text.brands, &names, text.none_listed));
            }
            Intent::Compare => {
                if req.candidates.is_empty() {
                    lines.push(text.compare_by_name.to_string());
                } else {
                    lines.push(text.compare_prompt.to_string());
                    lines.extend(numbered(req.candidates, MAX_LISTED, req.lang));
                }
            }
            Intent::Complaint => lines.push(text.complaint.to_string()),
            _ => {}
        }

        lines.push(closing(req.intent, req.lang).to_string());

        ComposedReply {
            text: lines.join("\n"),
            products,
            used_fallback,
        }
    }

    fn fallback(&self, intent: Intent, snapshot: &CatalogSnapshot) -> Vec<Product> {
        let ranked = match intent {
            Intent::Deals => self.ranker.trending_deals(snapshot, MAX_PICKS),
            _ => self.ranker.popular(snapshot, MAX_PICKS),
        };
        ranked.into_iter().map(|r| r.product).collect()
    }
}

/// First line of the sanitized generation, or a greeting when it is too short
fn opening_line(opening: &str, lang: Lang) -> String {
    let sanitized = sanitize_response(opening);
    let first = sanitized.lines().next().unwrap_or("").trim();
    if first.chars().count() >= MIN_OPENING_CHARS {
        first.to_string()
    } else {
        fallback_greeting(lang).to_string()
    }
}

fn numbered(products: &[Product], limit: usize, lang: Lang) -> Vec<String> {
    let label = phrases(lang).price_label;
    products
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, p)| format!("{}) {}{}{}", i + 1, p.title, label, price_text(p, lang)))
        .collect()
}

fn listing(prefix: &str, names: &[&str], empty: &str) -> String {
    if names.is_empty() {
        empty.to_string()
    } else {
        format!("{}{}", prefix, names.join(", "))
    }
}

/// Template follow-up suggestions. Never empty.
pub fn suggestions(ctx: &SessionContext, snapshot: &CatalogSnapshot, intent: Intent, lang: Lang) -> Vec<String> {
    let mut out: Vec<String> = match intent {
        Intent::Categories => snapshot
            .categories
            .iter()
            .take(3)
            .map(|c| match lang {
                Lang::Ar => format!("أرني منتجات {}", c.name),
                Lang::En => format!("Show me {} products", c.name),
            })
            .collect(),
        Intent::Browse | Intent::Deals => {
            let recent = if ctx.last_products.is_empty() {
                &snapshot.products
            } else {
                &ctx.last_products
            };
            let mut list: Vec<String> = recent
                .iter()
                .take(2)
                .map(|p| match lang {
                    Lang::Ar => format!("تفاصيل {}", p.title),
                    Lang::En => format!("Details of {}", p.title),
                })
                .collect();
            list.push(match lang {
                Lang::Ar => "عروض اليوم".to_string(),
                Lang::En => "Today's deals".to_string(),
            });
            list
        }
        Intent::Prices => fixed(lang, &["أرخص المنتجات", "عروض مخفّضة", "منتجات حسب ميزانيتي"], &[
            "Cheapest products",
            "Discounted deals",
            "Products within my budget",
        ]),
        _ => fixed(lang, &["أفضل العروض", "تصنيفات المنتجات", "أحدث الماركات"], &[
            "Best deals",
            "Product categories",
            "Latest brands",
        ]),
    };

    if out.is_empty() {
        out = fixed(lang, &["عروض اليوم", "أرني التصنيفات"], &["Today's deals", "Show me the categories"]);
    }
    out
}

fn fixed(lang: Lang, ar: &[&str], en: &[&str]) -> Vec<String> {
    let list = match lang {
        Lang::Ar => ar,
        Lang::En => en,
    };
    list.iter().map(|s| s.to_string()).collect()
}
