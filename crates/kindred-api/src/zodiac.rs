//! Birth date to zodiac sign, plus the fixed horoscope text for each sign.

use chrono::{Datelike, NaiveDate};

use kindred_types::models::ZodiacSign;

struct ZodiacEntry {
    sign: ZodiacSign,
    /// Inclusive (month, day) bounds. `start > end` means the range wraps
    /// past December 31st.
    start: (u32, u32),
    end: (u32, u32),
    horoscope: &'static str,
}

static ZODIAC_TABLE: [ZodiacEntry; 12] = [
    ZodiacEntry {
        sign: ZodiacSign::Aries,
        start: (3, 21),
        end: (4, 19),
        horoscope: "As an Aries, you are known for your bold, courageous, and pioneering spirit. You are a natural leader and tend to be enthusiastic about new adventures.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Taurus,
        start: (4, 20),
        end: (5, 20),
        horoscope: "As a Taurus, you are known for being reliable, patient, and practical. You have a strong appreciation for stability and comfort in your life.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Gemini,
        start: (5, 21),
        end: (6, 20),
        horoscope: "As a Gemini, you are known for your communication skills, curiosity, and adaptability. You have a quick mind and love to share ideas with others.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Cancer,
        start: (6, 21),
        end: (7, 22),
        horoscope: "As a Cancer, you are known for being emotional, intuitive, and family-oriented. You are deeply caring and protective of those you love.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Leo,
        start: (7, 23),
        end: (8, 22),
        horoscope: "As a Leo, you are known for your confidence, creativity, and generosity. You love being in the spotlight and enjoy making others happy.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Virgo,
        start: (8, 23),
        end: (9, 22),
        horoscope: "As a Virgo, you are known for your attention to detail, analytical mind, and practical approach. You strive for perfection and are highly organized.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Libra,
        start: (9, 23),
        end: (10, 22),
        horoscope: "As a Libra, you are known for your diplomacy, balance, and love of harmony. You seek justice and fairness in all relationships.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Scorpio,
        start: (10, 23),
        end: (11, 21),
        horoscope: "As a Scorpio, you are known for your intensity, passion, and determination. You are deeply perceptive and fiercely loyal to your loved ones.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Sagittarius,
        start: (11, 22),
        end: (12, 21),
        horoscope: "As a Sagittarius, you are known for your optimism, adventurous spirit, and love of freedom. You are a natural explorer and philosopher.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Capricorn,
        start: (12, 22),
        end: (1, 19),
        horoscope: "As a Capricorn, you are known for your ambition, discipline, and responsibility. You are a natural leader with strong organizational skills.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Aquarius,
        start: (1, 20),
        end: (2, 18),
        horoscope: "As an Aquarius, you are known for your independence, intellect, and humanitarian spirit. You are innovative and forward-thinking.",
    },
    ZodiacEntry {
        sign: ZodiacSign::Pisces,
        start: (2, 19),
        end: (3, 20),
        horoscope: "As a Pisces, you are known for your compassion, creativity, and intuition. You are deeply empathetic and artistic.",
    },
];

fn ordinal((month, day): (u32, u32)) -> u32 {
    month * 100 + day
}

impl ZodiacEntry {
    fn contains(&self, md: u32) -> bool {
        let (start, end) = (ordinal(self.start), ordinal(self.end));
        if start <= end {
            md >= start && md <= end
        } else {
            md >= start || md <= end
        }
    }
}

/// Sign for a birth date. Ranges are disjoint and cover the whole calendar,
/// so the Pisces fallback is unreachable in practice.
pub fn sign_for(date: NaiveDate) -> ZodiacSign {
    let md = ordinal((date.month(), date.day()));
    ZODIAC_TABLE
        .iter()
        .find(|entry| entry.contains(md))
        .map(|entry| entry.sign)
        .unwrap_or(ZodiacSign::Pisces)
}

/// The horoscope text bound to `sign`.
pub fn horoscope(sign: ZodiacSign) -> &'static str {
    ZODIAC_TABLE
        .iter()
        .find(|entry| entry.sign == sign)
        .map(|entry| entry.horoscope)
        .unwrap_or_default()
}

pub fn resolve(date: NaiveDate) -> (ZodiacSign, &'static str) {
    let sign = sign_for(date);
    (sign, horoscope(sign))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn every_day_of_a_leap_year_has_exactly_one_sign() {
        let mut date = md(1, 1);
        let mut days = 0;
        while date.year() == 2024 {
            let md = ordinal((date.month(), date.day()));
            let matches = ZODIAC_TABLE.iter().filter(|e| e.contains(md)).count();
            assert_eq!(matches, 1, "{} matched {} ranges", date, matches);
            days += 1;
            date = date.succ_opt().unwrap();
        }
        assert_eq!(days, 366);
    }

    #[test]
    fn boundaries_land_in_the_expected_sign() {
        assert_eq!(sign_for(md(3, 20)), ZodiacSign::Pisces);
        assert_eq!(sign_for(md(3, 21)), ZodiacSign::Aries);
        assert_eq!(sign_for(md(4, 19)), ZodiacSign::Aries);
        assert_eq!(sign_for(md(4, 20)), ZodiacSign::Taurus);
        assert_eq!(sign_for(md(12, 21)), ZodiacSign::Sagittarius);
        assert_eq!(sign_for(md(12, 22)), ZodiacSign::Capricorn);
        assert_eq!(sign_for(md(12, 31)), ZodiacSign::Capricorn);
        assert_eq!(sign_for(md(1, 1)), ZodiacSign::Capricorn);
        assert_eq!(sign_for(md(1, 19)), ZodiacSign::Capricorn);
        assert_eq!(sign_for(md(1, 20)), ZodiacSign::Aquarius);
        assert_eq!(sign_for(md(2, 29)), ZodiacSign::Pisces);
    }

    #[test]
    fn every_sign_has_its_own_horoscope() {
        for sign in ZodiacSign::ALL {
            assert!(!horoscope(*sign).is_empty());
        }
        let (sign, text) = resolve(md(5, 15));
        assert_eq!(sign, ZodiacSign::Taurus);
        assert!(text.starts_with("As a Taurus"));
    }
}
