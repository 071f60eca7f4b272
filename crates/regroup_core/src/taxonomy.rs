//! Fixed channel taxonomy used by reclassified output.
//!
//! Two tables drive resolution: category -> canonical channel names, and
//! canonical channel name -> aliases. Both are inverted once into read-only
//! lookup maps. Every canonical name must appear under exactly one category;
//! a name listed twice resolves to whichever category was inserted last.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Bucket for names that match neither a canonical name nor an alias.
pub const UNCATEGORIZED: &str = "其他频道";

const CATEGORY_TABLE: &[(&str, &[&str])] = &[
    (
        "央视频道",
        &[
            "CCTV1", "CCTV2", "CCTV3", "CCTV4", "CCTV5", "CCTV5+", "CCTV6", "CCTV7", "CCTV8",
            "CCTV9", "CCTV10", "CCTV11", "CCTV12", "CCTV13", "CCTV14", "CCTV15", "CCTV16",
            "CCTV17", "CCTV4K",
        ],
    ),
    (
        "卫视频道",
        &[
            "湖南卫视", "浙江卫视", "江苏卫视", "东方卫视", "北京卫视", "广东卫视", "深圳卫视",
            "山东卫视", "天津卫视", "安徽卫视", "湖北卫视", "河南卫视", "河北卫视", "四川卫视",
            "重庆卫视", "东南卫视", "江西卫视", "辽宁卫视", "黑龙江卫视", "吉林卫视", "广西卫视",
            "云南卫视", "贵州卫视", "陕西卫视", "山西卫视", "甘肃卫视", "海南卫视", "宁夏卫视",
            "青海卫视", "新疆卫视", "西藏卫视", "内蒙古卫视",
        ],
    ),
    (
        "影视频道",
        &["CHC电影", "CHC家庭影院", "CHC动作电影", "CCTV第一剧场", "CCTV风云剧场", "CCTV怀旧剧场"],
    ),
    (
        "体育频道",
        &["五星体育", "广东体育", "北京体育休闲", "CCTV风云足球", "CCTV高尔夫网球"],
    ),
    (
        "少儿频道",
        &["金鹰卡通", "卡酷少儿", "嘉佳卡通", "优漫卡通", "哈哈炫动"],
    ),
    (
        "港澳台频道",
        &["凤凰中文", "凤凰资讯", "凤凰香港", "翡翠台", "明珠台", "澳门莲花"],
    ),
];

const ALIAS_TABLE: &[(&str, &[&str])] = &[
    ("CCTV1", &["CCTV-1", "CCTV1综合", "CCTV-1综合", "CCTV-1 综合"]),
    ("CCTV2", &["CCTV-2", "CCTV2财经", "CCTV-2财经"]),
    ("CCTV3", &["CCTV-3", "CCTV3综艺", "CCTV-3综艺"]),
    ("CCTV4", &["CCTV-4", "CCTV4中文国际", "CCTV-4中文国际"]),
    ("CCTV5", &["CCTV-5", "CCTV5体育", "CCTV-5体育"]),
    ("CCTV5+", &["CCTV-5+", "CCTV5+体育赛事", "CCTV-5+体育赛事"]),
    ("CCTV6", &["CCTV-6", "CCTV6电影", "CCTV-6电影"]),
    ("CCTV7", &["CCTV-7", "CCTV7国防军事", "CCTV-7国防军事"]),
    ("CCTV8", &["CCTV-8", "CCTV8电视剧", "CCTV-8电视剧"]),
    ("CCTV9", &["CCTV-9", "CCTV9纪录", "CCTV-9纪录"]),
    ("CCTV10", &["CCTV-10", "CCTV10科教", "CCTV-10科教"]),
    ("CCTV11", &["CCTV-11", "CCTV11戏曲", "CCTV-11戏曲"]),
    ("CCTV12", &["CCTV-12", "CCTV12社会与法", "CCTV-12社会与法"]),
    ("CCTV13", &["CCTV-13", "CCTV13新闻", "CCTV-13新闻"]),
    ("CCTV14", &["CCTV-14", "CCTV14少儿", "CCTV-14少儿"]),
    ("CCTV15", &["CCTV-15", "CCTV15音乐", "CCTV-15音乐"]),
    ("CCTV16", &["CCTV-16", "CCTV16奥林匹克", "CCTV-16奥林匹克"]),
    ("CCTV17", &["CCTV-17", "CCTV17农业农村", "CCTV-17农业农村"]),
    ("CCTV4K", &["CCTV-4K", "CCTV4K超高清"]),
    ("东方卫视", &["上海卫视", "SiTV东方卫视"]),
    ("湖南卫视", &["湖南卫视HD", "湖南卫视高清"]),
    ("浙江卫视", &["浙江卫视HD", "浙江卫视高清"]),
    ("江苏卫视", &["江苏卫视HD", "江苏卫视高清"]),
    ("北京卫视", &["北京卫视HD", "北京卫视高清", "BTV卫视"]),
    ("广东卫视", &["广东卫视HD", "广东卫视高清"]),
    ("深圳卫视", &["深圳卫视HD", "深圳卫视高清"]),
    ("CHC电影", &["CHC高清电影"]),
    ("五星体育", &["上海五星体育", "SiTV五星体育"]),
    ("翡翠台", &["TVB翡翠台", "无线翡翠台"]),
    ("明珠台", &["TVB明珠台", "无线明珠台"]),
    ("凤凰中文", &["凤凰卫视中文台", "凤凰卫视"]),
    ("凤凰资讯", &["凤凰卫视资讯台"]),
];

static BUILTIN: Lazy<Taxonomy> =
    Lazy::new(|| Taxonomy::from_tables(CATEGORY_TABLE, ALIAS_TABLE));

#[derive(Debug, Clone)]
pub struct Taxonomy {
    display_order: Vec<String>,
    category_of: HashMap<String, String>,
    canonical_of: HashMap<String, String>,
}

impl Taxonomy {
    /// The built-in table, constructed on first use.
    pub fn builtin() -> &'static Taxonomy {
        &BUILTIN
    }

    /// Category order follows the order of `categories`; the uncategorized
    /// bucket always comes last.
    pub fn from_tables(categories: &[(&str, &[&str])], aliases: &[(&str, &[&str])]) -> Self {
        let mut display_order: Vec<String> = Vec::with_capacity(categories.len() + 1);
        let mut category_of = HashMap::new();
        for (category, names) in categories {
            display_order.push((*category).to_string());
            for name in *names {
                category_of.insert((*name).to_string(), (*category).to_string());
            }
        }
        if !display_order.iter().any(|c| c == UNCATEGORIZED) {
            display_order.push(UNCATEGORIZED.to_string());
        }

        let mut canonical_of = HashMap::new();
        for (canonical, names) in aliases {
            for alias in *names {
                canonical_of.insert((*alias).to_string(), (*canonical).to_string());
            }
        }

        Self {
            display_order,
            category_of,
            canonical_of,
        }
    }

    pub fn display_order(&self) -> &[String] {
        &self.display_order
    }

    /// Canonical name for `name`, if it is canonical itself or a known alias.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.category_of.contains_key(name) {
            return Some(name);
        }
        self.canonical_of.get(name).map(String::as_str)
    }

    /// Exact canonical match, then alias -> canonical -> category, else
    /// [`UNCATEGORIZED`].
    pub fn category_for(&self, name: &str) -> &str {
        let name = name.trim();
        self.canonical_name(name)
            .and_then(|canonical| self.category_of.get(canonical))
            .map(String::as_str)
            .unwrap_or(UNCATEGORIZED)
    }
}
