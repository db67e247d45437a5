use std::collections::{BTreeMap, HashSet};

use rand::{Rng, seq::SliceRandom, seq::index};

use crate::question_bank::{Chapter, Question};

/// Draw up to `k` items uniformly at random without replacement.
pub fn sample_without_replacement<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    k: usize,
    rng: &mut R,
) -> Vec<T> {
    let amount = k.min(items.len());
    index::sample(rng, items.len(), amount)
        .into_iter()
        .map(|position| items[position].clone())
        .collect()
}

pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// Build a mock-exam sequence: up to `per_chapter` questions from every chapter present,
/// shuffled together and capped at `total`.
pub fn select_exam_questions<R: Rng + ?Sized>(
    pool: &[Question],
    per_chapter: usize,
    total: usize,
    rng: &mut R,
) -> Vec<Question> {
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut partitions: BTreeMap<Chapter, Vec<Question>> = BTreeMap::new();
    for question in pool {
        if !partitions.contains_key(&question.chapter) {
            chapters.push(question.chapter);
        }
        partitions
            .entry(question.chapter)
            .or_default()
            .push(question.clone());
    }

    let mut selected: Vec<Question> = Vec::new();
    for chapter in chapters {
        if let Some(partition) = partitions.get(&chapter) {
            selected.extend(sample_without_replacement(partition, per_chapter, rng));
        }
    }

    shuffle(&mut selected, rng);
    selected.truncate(total);
    selected
}

/// Questions of `chapter` not yet answered in practice, in bank order.
pub fn select_practice_questions(
    pool: &[Question],
    chapter: Chapter,
    answered: &HashSet<u32>,
) -> Vec<Question> {
    pool.iter()
        .filter(|question| question.chapter == chapter && !answered.contains(&question.id))
        .cloned()
        .collect()
}
