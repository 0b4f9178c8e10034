use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::action::action_model::{Action, ElementState, TitleMatch, UrlMatch, WaitFor};
use crate::action::schema::MAX_WAIT_MS;

// ============================================================================
// Shared regex fragments
// ============================================================================

/// Japanese assertion tail: "〜ことを確認する", "〜こと", or nothing.
macro_rules! ja_tail {
    () => {
        r"(?:(?:こと)?を?(?:確認|チェック|検証)(?:する)?|こと)?"
    };
}

/// English verification lead-in: "verify that", "check", "make sure".
macro_rules! en_lead {
    () => {
        r"(?:(?:verify|check|confirm|assert|ensure|make sure)(?: that)? )?"
    };
}

macro_rules! zh_lead {
    () => {
        r"(?:确认|检查|验证|断言)?"
    };
}

/// Quoted literal (`q`) or a bare word run (`v`), for targets.
macro_rules! ja_target {
    () => {
        r"(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))"
    };
}

macro_rules! en_target {
    () => {
        r"(?:「(?P<q>[^」]+)」|(?P<v>[\w\-][\w\- ]*?))"
    };
}

/// A URL or path, quoted or bare.
macro_rules! url_arg {
    () => {
        r"(?:「(?P<q>[^」]+)」|(?P<v>https?://[^\s「」]+?|/[^\s「」]*?))"
    };
}

/// A value for URL/title comparisons, quoted or a single bare token.
macro_rules! value_arg {
    () => {
        r"(?:「(?P<q>[^」]+)」|(?P<v>[^\s「」]+?))"
    };
}

/// Particle marking what an assertion is about: が, topic は, colloquial って.
macro_rules! ja_subject {
    () => {
        r"(?:が|は|って)"
    };
}

macro_rules! ja_nouns {
    () => {
        r"(?:ボタン|リンク|要素|フィールド|入力欄|チェックボックス|アイコン|メニュー)"
    };
}

macro_rules! en_nouns {
    () => {
        r"(?:button|link|element|field|input|checkbox|icon|menu)"
    };
}

macro_rules! zh_nouns {
    () => {
        r"(?:按钮|链接|元素|输入框|复选框|图标|菜单)"
    };
}

// ============================================================================
// Rule table
// ============================================================================

/// Rule family. Within a family, each language's negation-bearing rules
/// precede its positive rules in [`rules()`]. Rule names end in the
/// language code (`_ja`, `_en`, `_zh`) wherever a family has negations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Navigate,
    Screenshot,
    WaitUntil,
    WaitDuration,
    Fill,
    Click,
    Url,
    Title,
    FormValue,
    Checkbox,
    Element,
    Text,
}

struct RuleDef {
    name: &'static str,
    family: Family,
    negated: bool,
    triggers: &'static [&'static str],
    pattern: &'static str,
    build: fn(&Captures) -> Option<Action>,
}

/// A compiled rule: trigger phrases, capture pattern and action constructor.
pub struct Rule {
    pub name: &'static str,
    pub family: Family,
    pub negated: bool,
    triggers: &'static [&'static str],
    pattern: Regex,
    build: fn(&Captures) -> Option<Action>,
}

impl Rule {
    /// Cheap prefilter on the lowercased text before the regex runs.
    pub fn triggered_by(&self, lowered: &str) -> bool {
        self.triggers.is_empty() || self.triggers.iter().any(|t| lowered.contains(t))
    }

    pub fn apply(&self, normalized: &str) -> Option<Action> {
        let caps = self.pattern.captures(normalized)?;
        (self.build)(&caps)
    }
}

// Order matters. Within each family negations come first. Across families:
// wait-until precedes the text rules (「完了」が表示されるまで待つ is a wait),
// and checkbox/element rules precede text rules so that a noun-bearing
// phrase never becomes a text assertion.
const RULE_DEFS: &[RuleDef] = &[
    // ---- navigate ----------------------------------------------------------
    RuleDef {
        name: "navigate_ja",
        family: Family::Navigate,
        negated: false,
        triggers: &["移動", "遷移", "アクセス", "開く"],
        pattern: concat!(
            r"^",
            url_arg!(),
            r"\s?(?:に|へ|を)(?:移動|遷移|アクセス|開く)(?:する)?$"
        ),
        build: build_navigate,
    },
    RuleDef {
        name: "navigate_en",
        family: Family::Navigate,
        negated: false,
        triggers: &["go to", "navigate", "open", "visit", "browse", "load"],
        pattern: concat!(
            r"(?i)^(?:go to|navigate to|open|visit|browse to|load)(?: the page)? ",
            url_arg!(),
            r"$"
        ),
        build: build_navigate,
    },
    RuleDef {
        name: "navigate_zh",
        family: Family::Navigate,
        negated: false,
        triggers: &["打开", "访问", "跳转", "导航", "前往"],
        pattern: concat!(
            r"^(?:打开|访问|跳转到|导航到|前往)\s?",
            url_arg!(),
            r"$"
        ),
        build: build_navigate,
    },
    // ---- screenshot --------------------------------------------------------
    RuleDef {
        name: "screenshot_ja",
        family: Family::Screenshot,
        negated: false,
        triggers: &["スクリーンショット", "スクショ", "キャプチャ"],
        pattern: r"^(?:スクリーンショット|スクショ|画面キャプチャ)を?(?:撮る|撮影する|取る|とる|保存する)?$",
        build: build_screenshot,
    },
    RuleDef {
        name: "screenshot_en",
        family: Family::Screenshot,
        negated: false,
        triggers: &["screenshot", "screen shot", "screen capture"],
        pattern: r"(?i)^(?:(?:take|capture|grab|save)(?: a| the)? )?(?:screenshot|screen shot|screen capture)$",
        build: build_screenshot,
    },
    RuleDef {
        name: "screenshot_zh",
        family: Family::Screenshot,
        negated: false,
        triggers: &["截图", "截屏"],
        pattern: r"^(?:保存|进行)?(?:屏幕)?(?:截图|截屏)$",
        build: build_screenshot,
    },
    // ---- wait until --------------------------------------------------------
    RuleDef {
        name: "wait_element_ja",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["まで"],
        pattern: concat!(
            r"^",
            ja_target!(),
            ja_nouns!(),
            r"が(?:表示される|現れる|出る|見える)まで(?:待つ|待機する)$"
        ),
        build: build_wait_element,
    },
    RuleDef {
        name: "wait_page_load_ja",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["まで"],
        pattern: r"^(?:ページ|画面)(?:が|の)?(?:読み込まれる|読み込みが完了する|読み込み完了|ロードされる|ロード完了)まで(?:待つ|待機する)$",
        build: build_wait_page_load,
    },
    RuleDef {
        name: "wait_text_ja",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["まで"],
        pattern: r"^「(?P<text>[^」]+)」(?:が|と)(?:表示される|表示されている|現れる|出る)まで(?:待つ|待機する)$",
        build: build_wait_text,
    },
    RuleDef {
        name: "wait_element_en",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["wait"],
        pattern: concat!(
            r"(?i)^wait (?:for|until) (?:the )?",
            en_target!(),
            r" ",
            en_nouns!(),
            r" (?:to appear|to be visible|to show|appears|is visible|is shown)$"
        ),
        build: build_wait_element,
    },
    RuleDef {
        name: "wait_page_load_en",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["wait"],
        pattern: r"(?i)^wait (?:for|until) (?:the )?page (?:to (?:load|finish loading)|loads|is loaded|load)$",
        build: build_wait_page_load,
    },
    RuleDef {
        name: "wait_text_en",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["wait"],
        pattern: r"(?i)^wait (?:for|until) (?:the text )?「(?P<text>[^」]+)」(?: (?:to appear|to be visible|to show up|appears|is visible|is shown))?$",
        build: build_wait_text,
    },
    RuleDef {
        name: "wait_element_zh",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["等"],
        pattern: concat!(
            r"^(?:等待|等)(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))",
            zh_nouns!(),
            r"(?:出现|显示)$"
        ),
        build: build_wait_element,
    },
    RuleDef {
        name: "wait_page_load_zh",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["等"],
        pattern: r"^(?:等待|等)页面(?:加载|载入)(?:完成|完毕)?$",
        build: build_wait_page_load,
    },
    RuleDef {
        name: "wait_text_zh",
        family: Family::WaitUntil,
        negated: false,
        triggers: &["等"],
        pattern: r"^(?:等待|等)「(?P<text>[^」]+)」(?:出现|显示)$",
        build: build_wait_text,
    },
    // ---- wait duration -----------------------------------------------------
    RuleDef {
        name: "wait_duration_ja",
        family: Family::WaitDuration,
        negated: false,
        triggers: &["待"],
        pattern: r"^(?P<n>\d+(?:\.\d+)?)\s?(?P<unit>ミリ秒|秒|分)間?(?:待つ|待機する|待機)$",
        build: build_wait_duration,
    },
    RuleDef {
        name: "wait_duration_en",
        family: Family::WaitDuration,
        negated: false,
        triggers: &["wait", "pause", "sleep"],
        pattern: r"(?i)^(?:wait|pause|sleep)(?: for)? (?P<n>\d+(?:\.\d+)?) ?(?P<unit>milliseconds?|ms|seconds?|secs?|s|minutes?|mins?)$",
        build: build_wait_duration,
    },
    RuleDef {
        name: "wait_duration_zh",
        family: Family::WaitDuration,
        negated: false,
        triggers: &["等"],
        pattern: r"^(?:等待|等)\s?(?P<n>\d+(?:\.\d+)?)\s?(?P<unit>毫秒|秒钟?|分钟)$",
        build: build_wait_duration,
    },
    // ---- fill --------------------------------------------------------------
    RuleDef {
        name: "fill_ja_target_first",
        family: Family::Fill,
        negated: false,
        triggers: &["入力"],
        pattern: concat!(
            r"^",
            ja_target!(),
            r"(?:フィールド|入力欄|欄)?に(?:「(?P<value>[^」]+)」|(?P<value_bare>[^「」\s]+?))\s?(?:と|を)入力(?:する)?$"
        ),
        build: build_fill,
    },
    RuleDef {
        name: "fill_ja_value_first",
        family: Family::Fill,
        negated: false,
        triggers: &["入力"],
        pattern: concat!(
            r"^「(?P<value>[^」]+)」を",
            ja_target!(),
            r"(?:フィールド|入力欄|欄)?に入力(?:する)?$"
        ),
        build: build_fill,
    },
    RuleDef {
        name: "fill_en_type",
        family: Family::Fill,
        negated: false,
        triggers: &["type", "enter", "input"],
        pattern: concat!(
            r"(?i)^(?:type|enter|input) 「(?P<value>[^」]*)」 (?:into|in|to) (?:the )?",
            en_target!(),
            r"(?: (?:field|input|box|textbox))?$"
        ),
        build: build_fill,
    },
    RuleDef {
        name: "fill_en_fill",
        family: Family::Fill,
        negated: false,
        triggers: &["fill"],
        pattern: concat!(
            r"(?i)^fill (?:in |out )?(?:the )?",
            en_target!(),
            r"(?: (?:field|input|box|textbox))? with 「(?P<value>[^」]*)」$"
        ),
        build: build_fill,
    },
    RuleDef {
        name: "fill_zh",
        family: Family::Fill,
        negated: false,
        triggers: &["输入"],
        pattern: r"^(?:在|向)(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))(?:输入框|字段|栏)?(?:中|里|内)?输入「(?P<value>[^」]*)」$",
        build: build_fill,
    },
    RuleDef {
        name: "fill_zh_value_first",
        family: Family::Fill,
        negated: false,
        triggers: &["输入"],
        pattern: r"^输入「(?P<value>[^」]*)」(?:到|至)(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))(?:输入框|字段|栏)?(?:中|里)?$",
        build: build_fill,
    },
    // ---- click -------------------------------------------------------------
    RuleDef {
        name: "click_ja",
        family: Family::Click,
        negated: false,
        triggers: &["クリック", "押", "タップ"],
        pattern: concat!(
            r"^",
            ja_target!(),
            r"(?:ボタン|リンク|アイコン|メニュー)?を(?:クリック|押す|押する|タップ)(?:する)?$"
        ),
        build: build_click,
    },
    RuleDef {
        name: "click_en",
        family: Family::Click,
        negated: false,
        triggers: &["click", "press", "tap"],
        pattern: concat!(
            r"(?i)^(?:click|press|tap)(?: on)? (?:the )?",
            en_target!(),
            r"(?: (?:button|link|icon|menu))?$"
        ),
        build: build_click,
    },
    RuleDef {
        name: "click_zh",
        family: Family::Click,
        negated: false,
        triggers: &["点击", "单击", "按"],
        pattern: r"^(?:点击|单击|按下|按)(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))(?:按钮|链接|图标|菜单)?$",
        build: build_click,
    },
    // ---- URL ---------------------------------------------------------------
    RuleDef {
        name: "url_starts_ja",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^(?:現在の|ページの)?URL(?:が|は)",
            value_arg!(),
            r"で始まる",
            ja_tail!(),
            r"$"
        ),
        build: build_url_starts,
    },
    RuleDef {
        name: "url_ends_ja",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^(?:現在の|ページの)?URL(?:が|は)",
            value_arg!(),
            r"で終わる",
            ja_tail!(),
            r"$"
        ),
        build: build_url_ends,
    },
    RuleDef {
        name: "url_equals_ja",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^(?:現在の|ページの)?URL(?:が|は)",
            value_arg!(),
            r"(?:である|と一致する|と等しい|になっている|になる)",
            ja_tail!(),
            r"$"
        ),
        build: build_url_equals,
    },
    RuleDef {
        name: "url_contains_ja",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^(?:現在の|ページの)?URLに",
            value_arg!(),
            r"が含まれ(?:ている|る)",
            ja_tail!(),
            r"$"
        ),
        build: build_url_contains,
    },
    RuleDef {
        name: "url_starts_en",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?(?:current |page )?url (?:should )?(?:starts?|begins?) with ",
            value_arg!(),
            r"$"
        ),
        build: build_url_starts,
    },
    RuleDef {
        name: "url_ends_en",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?(?:current |page )?url (?:should )?ends? with ",
            value_arg!(),
            r"$"
        ),
        build: build_url_ends,
    },
    RuleDef {
        name: "url_equals_en",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?(?:current |page )?url (?:should be|should equal|is equal to|equals|is) ",
            value_arg!(),
            r"$"
        ),
        build: build_url_equals,
    },
    RuleDef {
        name: "url_contains_en",
        family: Family::Url,
        negated: false,
        triggers: &["url"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?(?:current |page )?url (?:should )?(?:contains?|includes?) ",
            value_arg!(),
            r"$"
        ),
        build: build_url_contains,
    },
    RuleDef {
        name: "url_starts_zh",
        family: Family::Url,
        negated: false,
        triggers: &["url", "网址"],
        pattern: concat!(
            r"(?i)^",
            zh_lead!(),
            r"(?:当前|页面)?(?:URL|网址)以",
            value_arg!(),
            r"开头$"
        ),
        build: build_url_starts,
    },
    RuleDef {
        name: "url_ends_zh",
        family: Family::Url,
        negated: false,
        triggers: &["url", "网址"],
        pattern: concat!(
            r"(?i)^",
            zh_lead!(),
            r"(?:当前|页面)?(?:URL|网址)以",
            value_arg!(),
            r"结尾$"
        ),
        build: build_url_ends,
    },
    RuleDef {
        name: "url_equals_zh",
        family: Family::Url,
        negated: false,
        triggers: &["url", "网址"],
        pattern: concat!(
            r"(?i)^",
            zh_lead!(),
            r"(?:当前|页面)?(?:URL|网址)(?:是|为|等于)",
            value_arg!(),
            r"$"
        ),
        build: build_url_equals,
    },
    RuleDef {
        name: "url_contains_zh",
        family: Family::Url,
        negated: false,
        triggers: &["url", "网址"],
        pattern: concat!(
            r"(?i)^",
            zh_lead!(),
            r"(?:当前|页面)?(?:URL|网址)中?(?:包含|含有)",
            value_arg!(),
            r"$"
        ),
        build: build_url_contains,
    },
    // ---- title -------------------------------------------------------------
    RuleDef {
        name: "title_equals_ja",
        family: Family::Title,
        negated: false,
        triggers: &["タイトル"],
        pattern: concat!(
            r"^(?:ページの?)?タイトル(?:が|は)",
            value_arg!(),
            r"(?:である|と一致する|と等しい|になっている)",
            ja_tail!(),
            r"$"
        ),
        build: build_title_equals,
    },
    RuleDef {
        name: "title_contains_ja",
        family: Family::Title,
        negated: false,
        triggers: &["タイトル"],
        pattern: concat!(
            r"^(?:ページの?)?タイトルに",
            value_arg!(),
            r"が含まれ(?:ている|る)",
            ja_tail!(),
            r"$"
        ),
        build: build_title_contains,
    },
    RuleDef {
        name: "title_equals_en",
        family: Family::Title,
        negated: false,
        triggers: &["title"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?(?:page )?title (?:should be|should equal|is equal to|equals|is) ",
            value_arg!(),
            r"$"
        ),
        build: build_title_equals,
    },
    RuleDef {
        name: "title_contains_en",
        family: Family::Title,
        negated: false,
        triggers: &["title"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?(?:page )?title (?:should )?(?:contains?|includes?) ",
            value_arg!(),
            r"$"
        ),
        build: build_title_contains,
    },
    RuleDef {
        name: "title_equals_zh",
        family: Family::Title,
        negated: false,
        triggers: &["标题"],
        pattern: concat!(
            r"^",
            zh_lead!(),
            r"(?:页面)?标题(?:是|为|等于)",
            value_arg!(),
            r"$"
        ),
        build: build_title_equals,
    },
    RuleDef {
        name: "title_contains_zh",
        family: Family::Title,
        negated: false,
        triggers: &["标题"],
        pattern: concat!(
            r"^",
            zh_lead!(),
            r"(?:页面)?标题中?(?:包含|含有)",
            value_arg!(),
            r"$"
        ),
        build: build_title_contains,
    },
    // ---- form value --------------------------------------------------------
    RuleDef {
        name: "form_value_ja",
        family: Family::FormValue,
        negated: false,
        triggers: &["値"],
        pattern: concat!(
            r"^",
            ja_target!(),
            r"(?:フィールド|入力欄|欄)?の値が「(?P<value>[^」]*)」(?:である|になっている|と一致する)?",
            ja_tail!(),
            r"$"
        ),
        build: build_form_value,
    },
    RuleDef {
        name: "form_value_en_of",
        family: Family::FormValue,
        negated: false,
        triggers: &["value"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"the value of (?:the )?",
            en_target!(),
            r"(?: (?:field|input|box))? (?:should be|is|equals) 「(?P<value>[^」]*)」$"
        ),
        build: build_form_value,
    },
    RuleDef {
        name: "form_value_en_has",
        family: Family::FormValue,
        negated: false,
        triggers: &["value"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?",
            en_target!(),
            r"(?: (?:field|input|box))? (?:has|should have) (?:the )?value 「(?P<value>[^」]*)」$"
        ),
        build: build_form_value,
    },
    RuleDef {
        name: "form_value_zh",
        family: Family::FormValue,
        negated: false,
        triggers: &["值"],
        pattern: r"^(?:确认|检查|验证)?(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))(?:输入框)?的值(?:是|为|等于)「(?P<value>[^」]*)」$",
        build: build_form_value,
    },
    // ---- checkbox ----------------------------------------------------------
    RuleDef {
        name: "checkbox_unchecked_ja",
        family: Family::Checkbox,
        negated: true,
        triggers: &["チェック", "オフ"],
        pattern: concat!(
            r"^",
            ja_target!(),
            r"(?:チェックボックス)?(?:",
            ja_subject!(),
            r"(?:チェックされていない|オフになっている|オフである)|にチェックが入っていない)",
            ja_tail!(),
            r"$"
        ),
        build: build_unchecked,
    },
    RuleDef {
        name: "checkbox_checked_ja",
        family: Family::Checkbox,
        negated: false,
        triggers: &["チェック", "オン"],
        pattern: concat!(
            r"^",
            ja_target!(),
            r"(?:チェックボックス)?(?:",
            ja_subject!(),
            r"(?:チェックされている|オンになっている|オンである)|にチェックが入っている)",
            ja_tail!(),
            r"$"
        ),
        build: build_checked,
    },
    RuleDef {
        name: "checkbox_unchecked_en",
        family: Family::Checkbox,
        negated: true,
        triggers: &["check"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?",
            en_target!(),
            r"(?: checkbox)? (?:is not checked|isn't checked|is unchecked|should not be checked|should be unchecked)$"
        ),
        build: build_unchecked,
    },
    RuleDef {
        name: "checkbox_checked_en",
        family: Family::Checkbox,
        negated: false,
        triggers: &["check"],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?",
            en_target!(),
            r"(?: checkbox)? (?:is checked|should be checked)$"
        ),
        build: build_checked,
    },
    RuleDef {
        name: "checkbox_unchecked_zh",
        family: Family::Checkbox,
        negated: true,
        triggers: &["勾选", "选中"],
        pattern: r"^(?:确认|检查|验证)?(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))(?:复选框)?(?:未|没有|没)(?:被)?(?:勾选|选中)$",
        build: build_unchecked,
    },
    RuleDef {
        name: "checkbox_checked_zh",
        family: Family::Checkbox,
        negated: false,
        triggers: &["勾选", "选中"],
        pattern: r"^(?:确认|检查|验证)?(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))(?:复选框)?(?:已|已经)?(?:被)?(?:勾选|选中)$",
        build: build_checked,
    },
    // ---- element -----------------------------------------------------------
    RuleDef {
        name: "element_hidden_ja",
        family: Family::Element,
        negated: true,
        triggers: &[],
        pattern: concat!(
            r"^",
            ja_target!(),
            ja_nouns!(),
            ja_subject!(),
            r"(?:表示されていない|見えていない|見えない|非表示である|非表示になっている|非表示)",
            ja_tail!(),
            r"$"
        ),
        build: build_element_hidden,
    },
    RuleDef {
        name: "element_absent_ja",
        family: Family::Element,
        negated: true,
        triggers: &[],
        pattern: concat!(
            r"^",
            ja_target!(),
            ja_nouns!(),
            ja_subject!(),
            r"(?:存在しない|存在していない|ない)",
            ja_tail!(),
            r"$"
        ),
        build: build_element_absent,
    },
    RuleDef {
        name: "element_visible_ja",
        family: Family::Element,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"^",
            ja_target!(),
            ja_nouns!(),
            ja_subject!(),
            r"(?:表示されている|見えている|見える)",
            ja_tail!(),
            r"$"
        ),
        build: build_element_visible,
    },
    RuleDef {
        name: "element_exists_ja",
        family: Family::Element,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"^",
            ja_target!(),
            ja_nouns!(),
            ja_subject!(),
            r"(?:存在する|存在している|ある)",
            ja_tail!(),
            r"$"
        ),
        build: build_element_exists,
    },
    RuleDef {
        name: "element_hidden_en",
        family: Family::Element,
        negated: true,
        triggers: &[],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?",
            en_target!(),
            r" ",
            en_nouns!(),
            r" (?:is not visible|isn't visible|is hidden|is invisible|should be hidden|should not be visible)$"
        ),
        build: build_element_hidden,
    },
    RuleDef {
        name: "element_absent_en",
        family: Family::Element,
        negated: true,
        triggers: &[],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the |there is no )?",
            en_target!(),
            r" ",
            en_nouns!(),
            r"(?: (?:does not exist|doesn't exist|is not present|isn't present|is absent|should not exist))?$"
        ),
        build: build_element_absent_en,
    },
    RuleDef {
        name: "element_visible_en",
        family: Family::Element,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?",
            en_target!(),
            r" ",
            en_nouns!(),
            r" (?:is visible|is shown|is displayed|should be visible)$"
        ),
        build: build_element_visible,
    },
    RuleDef {
        name: "element_exists_en",
        family: Family::Element,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"(?i)^",
            en_lead!(),
            r"(?:the )?",
            en_target!(),
            r" ",
            en_nouns!(),
            r" (?:exists|is present|should exist)$"
        ),
        build: build_element_exists,
    },
    RuleDef {
        name: "element_hidden_zh",
        family: Family::Element,
        negated: true,
        triggers: &[],
        pattern: concat!(
            r"^",
            zh_lead!(),
            r"(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))",
            zh_nouns!(),
            r"(?:不可见|被隐藏|隐藏|没有显示|未显示|不显示)$"
        ),
        build: build_element_hidden,
    },
    RuleDef {
        name: "element_absent_zh",
        family: Family::Element,
        negated: true,
        triggers: &[],
        pattern: concat!(
            r"^",
            zh_lead!(),
            r"(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))",
            zh_nouns!(),
            r"不存在$"
        ),
        build: build_element_absent,
    },
    RuleDef {
        name: "element_visible_zh",
        family: Family::Element,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"^",
            zh_lead!(),
            r"(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))",
            zh_nouns!(),
            r"(?:可见|已显示|显示)$"
        ),
        build: build_element_visible,
    },
    RuleDef {
        name: "element_exists_zh",
        family: Family::Element,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"^",
            zh_lead!(),
            r"(?:「(?P<q>[^」]+)」|(?P<v>[^「」\s]+?))",
            zh_nouns!(),
            r"存在$"
        ),
        build: build_element_exists,
    },
    // ---- text --------------------------------------------------------------
    RuleDef {
        name: "text_not_visible_ja",
        family: Family::Text,
        negated: true,
        triggers: &[],
        pattern: concat!(
            r"^(?:ページに|画面に)?(?:「(?P<q>[^」]+)」|(?P<v>[^「」]+?))(?:という(?:テキスト|文字|文言|メッセージ))?(?:が|は|って|と)(?:ページに|画面に)?",
            r"(?:表示されていない|表示されない|見えていない|見えない|出ていない|存在しない|存在していない|ない)",
            ja_tail!(),
            r"$"
        ),
        build: build_text_hidden,
    },
    RuleDef {
        name: "text_visible_ja",
        family: Family::Text,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"^(?:ページに|画面に)?(?:「(?P<q>[^」]+)」|(?P<v>[^「」]+?))(?:という(?:テキスト|文字|文言|メッセージ))?(?:が|は|って|と)(?:ページに|画面に)?",
            r"(?:表示されている|表示される|見えている|見える|出ている|存在する|存在している|ある)",
            ja_tail!(),
            r"$"
        ),
        build: build_text_visible,
    },
    RuleDef {
        name: "text_not_visible_en",
        family: Family::Text,
        negated: true,
        triggers: &["not", "n't", "no "],
        pattern: concat!(
            r"(?i)^(?:",
            en_lead!(),
            r"(?:the )?(?:text |message )?「(?P<q>[^」]+)」 (?:is not|isn't) (?:visible|shown|displayed|present)(?: on (?:the )?(?:page|screen))?",
            r"|",
            r"「(?P<q2>[^」]+)」 (?:does not|doesn't) (?:appear|exist)(?: on (?:the )?(?:page|screen))?",
            r"|",
            r"(?:i )?(?:should not|shouldn't|cannot|can't|do not|don't) see 「(?P<q3>[^」]+)」(?: on (?:the )?(?:page|screen))?",
            r"|",
            r"(?:the )?page (?:does not|doesn't) (?:show|contain|display) 「(?P<q4>[^」]+)」",
            r")$"
        ),
        build: build_text_hidden,
    },
    RuleDef {
        name: "text_visible_en",
        family: Family::Text,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"(?i)^(?:",
            en_lead!(),
            r"(?:the )?(?:text |message )?「(?P<q>[^」]+)」 (?:is (?:visible|shown|displayed|present)|appears|exists)(?: on (?:the )?(?:page|screen))?",
            r"|",
            r"(?:i )?(?:should |can )?see 「(?P<q3>[^」]+)」(?: on (?:the )?(?:page|screen))?",
            r"|",
            r"(?:the )?page (?:shows|contains|displays) 「(?P<q4>[^」]+)」",
            r")$"
        ),
        build: build_text_visible,
    },
    RuleDef {
        name: "text_not_visible_zh",
        family: Family::Text,
        negated: true,
        triggers: &["没", "未", "不"],
        pattern: concat!(
            r"^(?:",
            zh_lead!(),
            r"(?:页面|页面上|画面)?(?:没有显示|未显示|不显示|没有出现|不包含|没有)「(?P<q>[^」]+)」",
            r"|",
            zh_lead!(),
            r"「(?P<q2>[^」]+)」(?:没有|未|不)(?:显示|出现|存在|可见)(?:在页面上?)?",
            r")$"
        ),
        build: build_text_hidden,
    },
    RuleDef {
        name: "text_visible_zh",
        family: Family::Text,
        negated: false,
        triggers: &[],
        pattern: concat!(
            r"^(?:",
            r"(?:确认|检查|验证|断言)(?:页面|页面上|画面)?(?:显示|出现|包含|有)了?「(?P<q>[^」]+)」",
            r"|",
            zh_lead!(),
            r"「(?P<q2>[^」]+)」(?:已|已经)?(?:显示|出现|存在|可见)(?:在页面上?)?了?",
            r")$"
        ),
        build: build_text_visible,
    },
];

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    RULE_DEFS
        .iter()
        .filter_map(|def| match Regex::new(def.pattern) {
            Ok(pattern) => Some(Rule {
                name: def.name,
                family: def.family,
                negated: def.negated,
                triggers: def.triggers,
                pattern,
                build: def.build,
            }),
            Err(e) => {
                tracing::error!(rule = def.name, error = %e, "rule pattern failed to compile");
                None
            }
        })
        .collect()
});

/// The compiled rule library in priority order.
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Number of declared rules; differs from `rules().len()` only if a pattern
/// failed to compile.
pub fn declared_rule_count() -> usize {
    RULE_DEFS.len()
}

// ============================================================================
// Capture helpers and constructors
// ============================================================================

/// First non-empty capture among `names`, trimmed.
fn capture(caps: &Captures, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| caps.name(n))
        .map(|m| m.as_str().trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn target(caps: &Captures) -> Option<String> {
    capture(caps, &["q", "v"]).map(|t| {
        // bare English targets may carry a leading article
        t.strip_prefix("the ").map(str::to_string).unwrap_or(t)
    })
}

fn literal_text(caps: &Captures) -> Option<String> {
    capture(caps, &["text", "q", "q2", "q3", "q4", "v"])
}

fn build_navigate(caps: &Captures) -> Option<Action> {
    Some(Action::Navigate {
        url: capture(caps, &["q", "v"])?,
    })
}

fn build_screenshot(_caps: &Captures) -> Option<Action> {
    Some(Action::Screenshot)
}

fn build_wait_element(caps: &Captures) -> Option<Action> {
    Some(Action::Wait {
        condition: WaitFor::ElementVisible {
            target_desc: target(caps)?,
        },
    })
}

fn build_wait_page_load(_caps: &Captures) -> Option<Action> {
    Some(Action::Wait {
        condition: WaitFor::PageLoad,
    })
}

fn build_wait_text(caps: &Captures) -> Option<Action> {
    Some(Action::Wait {
        condition: WaitFor::TextVisible {
            text: capture(caps, &["text"])?,
        },
    })
}

/// Convert an amount and unit word to milliseconds.
pub fn duration_ms(amount: f64, unit: &str) -> Option<u64> {
    let unit = unit.to_lowercase();
    let factor = match unit.as_str() {
        "ミリ秒" | "毫秒" | "ms" | "millisecond" | "milliseconds" => 1.0,
        "分" | "分钟" | "minute" | "minutes" | "min" | "mins" => 60_000.0,
        _ => 1000.0,
    };
    let ms = (amount * factor).round();
    if ms < 1.0 || ms > MAX_WAIT_MS as f64 {
        return None;
    }
    Some(ms as u64)
}

fn build_wait_duration(caps: &Captures) -> Option<Action> {
    let amount: f64 = caps.name("n")?.as_str().parse().ok()?;
    let unit = caps.name("unit")?.as_str();
    Some(Action::wait_ms(duration_ms(amount, unit)?))
}

fn build_fill(caps: &Captures) -> Option<Action> {
    Some(Action::Fill {
        target_desc: target(caps)?,
        value: caps
            .name("value")
            .or_else(|| caps.name("value_bare"))
            .map(|m| m.as_str().to_string())?,
    })
}

fn build_click(caps: &Captures) -> Option<Action> {
    Some(Action::Click {
        target_desc: target(caps)?,
    })
}

fn url_assert(caps: &Captures, mode: UrlMatch) -> Option<Action> {
    Some(Action::AssertUrl {
        mode,
        value: capture(caps, &["q", "v"])?,
    })
}

fn build_url_starts(caps: &Captures) -> Option<Action> {
    url_assert(caps, UrlMatch::Starts)
}

fn build_url_ends(caps: &Captures) -> Option<Action> {
    url_assert(caps, UrlMatch::Ends)
}

fn build_url_equals(caps: &Captures) -> Option<Action> {
    url_assert(caps, UrlMatch::Equals)
}

fn build_url_contains(caps: &Captures) -> Option<Action> {
    url_assert(caps, UrlMatch::Contains)
}

fn build_title_equals(caps: &Captures) -> Option<Action> {
    Some(Action::AssertTitle {
        mode: TitleMatch::Equals,
        value: capture(caps, &["q", "v"])?,
    })
}

fn build_title_contains(caps: &Captures) -> Option<Action> {
    Some(Action::AssertTitle {
        mode: TitleMatch::Contains,
        value: capture(caps, &["q", "v"])?,
    })
}

fn build_form_value(caps: &Captures) -> Option<Action> {
    Some(Action::AssertFormValue {
        target_desc: target(caps)?,
        value: caps.name("value")?.as_str().to_string(),
    })
}

fn build_checked(caps: &Captures) -> Option<Action> {
    Some(Action::AssertCheckbox {
        target_desc: target(caps)?,
        checked: true,
    })
}

fn build_unchecked(caps: &Captures) -> Option<Action> {
    Some(Action::AssertCheckbox {
        target_desc: target(caps)?,
        checked: false,
    })
}

fn element(caps: &Captures, state: ElementState) -> Option<Action> {
    Some(Action::AssertElement {
        target_desc: target(caps)?,
        state,
    })
}

fn build_element_hidden(caps: &Captures) -> Option<Action> {
    element(caps, ElementState::Hidden)
}

fn build_element_absent(caps: &Captures) -> Option<Action> {
    element(caps, ElementState::Absent)
}

/// "there is no X button" carries its negation up front; a bare
/// "the X button" with no predicate is not an assertion at all.
fn build_element_absent_en(caps: &Captures) -> Option<Action> {
    let whole = caps.get(0)?.as_str().to_lowercase();
    let negated = whole.contains("there is no ")
        || ["not exist", "n't exist", "not present", "n't present", "absent"]
            .iter()
            .any(|p| whole.contains(p));
    if !negated {
        return None;
    }
    element(caps, ElementState::Absent)
}

fn build_element_visible(caps: &Captures) -> Option<Action> {
    element(caps, ElementState::Visible)
}

fn build_element_exists(caps: &Captures) -> Option<Action> {
    element(caps, ElementState::Exists)
}

fn build_text_visible(caps: &Captures) -> Option<Action> {
    Some(Action::AssertTextVisible {
        text: literal_text(caps)?,
        negate: false,
    })
}

fn build_text_hidden(caps: &Captures) -> Option<Action> {
    Some(Action::AssertTextVisible {
        text: literal_text(caps)?,
        negate: true,
    })
}
