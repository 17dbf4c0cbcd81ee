// Small end-to-end run of the dual-reward criterion on a built-in corpus.
//
//   cargo run -- [config.json]
//
// The primal model starts as a word-for-word copier, the dual model starts
// random; watch the dual loss fall as it learns to undo the primal model.
use log::info;

use ferrite_dual::{
    collate, Batch, Direction, Dictionary, DualConfig, DualRewardCriterion, GenerateOptions,
    LexicalTranslator, LoggingOutput, Result, Sample, Sgd, WeightedCrossEntropy,
};

const CORPUS: &[&str] = &[
    "the cat sat on the mat",
    "a dog ran in the park",
    "the bird sang a song",
    "my friend read the book",
    "the sun is warm today",
    "we walk to the river",
];

const STEPS: usize = 30;
const BATCH_SIZE: usize = 3;

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => DualConfig::load_json(&path)?,
        None => DualConfig { beam: 2, max_len_a: 1.2, max_len_b: 2.0, ..DualConfig::default() },
    };

    let src_dict = Dictionary::from_lines(CORPUS.iter().copied());
    let tgt_dict = src_dict.clone();

    let mut primal = LexicalTranslator::identity(&src_dict, &tgt_dict, 4.0);
    let mut dual = LexicalTranslator::new(&tgt_dict, &src_dict, 7);
    let mut primal_opt = Sgd::new(0.05);
    let mut dual_opt = Sgd::new(0.5);

    let batches = monolingual_batches(&src_dict);
    let criterion = DualRewardCriterion::new(config, WeightedCrossEntropy)?;
    let options = GenerateOptions::default();

    for step in 0..STEPS {
        let batch = &batches[step % batches.len()];
        let out = criterion.forward(
            batch,
            Direction { model: &primal, optimizer: &mut primal_opt, dict: &tgt_dict },
            Direction { model: &dual, optimizer: &mut dual_opt, dict: &src_dict },
            None,
            true,
            &options,
        )?;
        primal_opt.step(&mut primal)?;
        dual_opt.step(&mut dual)?;

        if step % 5 == 0 || step + 1 == STEPS {
            print_step(step, &out.logging)?;
        }
    }

    info!("finished {STEPS} dual steps");
    Ok(())
}

fn monolingual_batches(dict: &Dictionary) -> Vec<Batch> {
    let samples: Vec<Sample> = CORPUS
        .iter()
        .enumerate()
        .map(|(id, line)| Sample::monolingual(id, dict.encode_line(line, false)))
        .collect();
    samples
        .chunks(BATCH_SIZE)
        .map(|chunk| collate(chunk, dict.pad(), dict.eos(), false))
        .collect()
}

fn print_step(step: usize, logging: &LoggingOutput) -> Result<()> {
    let LoggingOutput::Nested(parts) = logging else {
        return Ok(());
    };
    for (name, record) in parts {
        let agg = DualRewardCriterion::<WeightedCrossEntropy>::aggregate_logging_outputs(&[
            LoggingOutput::Flat(record.clone()),
        ])?;
        println!("step {step:>3} {name:<6} {}", serde_json::to_string(&agg)?);
    }
    Ok(())
}
