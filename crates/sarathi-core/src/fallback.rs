//! Canned answers used when the guidance API cannot be reached.

use rand::seq::SliceRandom;
use rand::Rng;

pub const KARMA_RESPONSE: &str = "The theory of Karma states that our actions create an energy that returns to us in this or another lifetime. As Krishna says: 'You have a right to perform your prescribed duties, but you are not entitled to the fruits of your actions.' (Chapter 2, Verse 47)";

pub const DHARMA_RESPONSE: &str = "Dharma refers to the moral order that sustains the cosmos, society, and the individual. Krishna teaches: 'It is better to perform one's own duties imperfectly than to master the duties of another. By fulfilling the obligations born of one's nature, a person never incurs sin.' (Chapter 18, Verse 47)";

pub const QUOTATIONS: [&str; 10] = [
    "Just as a person puts on new garments, giving up old ones, the soul similarly accepts new material bodies, giving up the old and useless ones. (Chapter 2, Verse 22)",
    "For the soul there is neither birth nor death at any time. He has not come into being, does not come into being, and will not come into being. He is unborn, eternal, ever-existing, and primeval. (Chapter 2, Verse 20)",
    "What is night for all beings is the time of awakening for the self-controlled; and the time of awakening for all beings is night for the introspective sage. (Chapter 2, Verse 69)",
    "Perform your prescribed duties, for action is better than inaction. Even to maintain your body, you have to work. (Chapter 3, Verse 8)",
    "The wise see that there is action in the midst of inaction and inaction in the midst of action. Their consciousness is unified, and every act is done with complete awareness. (Chapter 4, Verse 18)",
    "One who sees inaction in action, and action in inaction, is intelligent among men, and he is in the transcendental position, although engaged in all sorts of activities. (Chapter 4, Verse 18)",
    "The embodied soul is eternal, indestructible, and immeasurable; therefore, do not grieve, Arjuna. (Chapter 2, Verse 25)",
    "No one who does good work will ever come to a bad end, either here or in the world to come. (Chapter 6, Verse 40)",
    "Whatever action is performed by a great man, common men follow in his footsteps, and whatever standards he sets by exemplary acts, all the world pursues. (Chapter 3, Verse 21)",
    "The happiness which comes from long practice, which leads to the end of suffering, which at first is like poison, but at last like nectar - this kind of happiness arises from the serenity of one's own mind. (Chapter 18, Verse 37)",
];

/// Keyword-triggered answer, if the text names one of the themes.
///
/// Karma keywords win over dharma keywords.
pub fn keyword_response(user_text: &str) -> Option<&'static str> {
    let text = user_text.to_lowercase();

    if text.contains("karma") || text.contains("action") {
        Some(KARMA_RESPONSE)
    } else if text.contains("dharma") || text.contains("duty") {
        Some(DHARMA_RESPONSE)
    } else {
        None
    }
}

/// Pick the fallback answer for `user_text`.
pub fn select<R: Rng + ?Sized>(user_text: &str, rng: &mut R) -> &'static str {
    keyword_response(user_text).unwrap_or_else(|| random_quotation(rng))
}

pub fn random_quotation<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    QUOTATIONS.choose(rng).copied().unwrap_or(QUOTATIONS[0])
}
